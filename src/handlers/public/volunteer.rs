use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::database::{parse_id, DeleteResult, Listing, UPCOMING_NEEDS_LIMIT};
use crate::error::ApiResult;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// GET /volunteer?search= - all listings, optionally filtered by title
pub async fn list_volunteers(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Listing>>> {
    let search = query.search.as_deref().filter(|s| !s.is_empty());
    Ok(Json(state.listings.search(search).await?))
}

/// GET /volunteer/:id - single listing or `null`
pub async fn get_volunteer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<Listing>>> {
    let id = parse_id(&id)?;
    Ok(Json(state.listings.get(id).await?))
}

/// GET /volunteer-needs - soonest open deadlines
pub async fn volunteer_needs(State(state): State<AppState>) -> ApiResult<Json<Vec<Listing>>> {
    let now = chrono::Utc::now();
    Ok(Json(state.listings.upcoming(now, UPCOMING_NEEDS_LIMIT).await?))
}

/// DELETE /volunteer/:id - unconditional, no session required
pub async fn delete_volunteer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResult>> {
    let id = parse_id(&id)?;
    let result = state.listings.delete(id).await?;
    tracing::info!("Deleted listing {} ({} removed)", id, result.deleted_count);
    Ok(Json(result))
}
