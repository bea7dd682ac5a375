use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::database::{parse_id, DeleteResult, JoinRequest};
use crate::error::ApiResult;
use crate::server::AppState;

/// GET /requests
pub async fn list_requests(State(state): State<AppState>) -> ApiResult<Json<Vec<JoinRequest>>> {
    Ok(Json(state.requests.all().await?))
}

/// GET /requests/:id - single request or `null`
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<JoinRequest>>> {
    let id = parse_id(&id)?;
    Ok(Json(state.requests.get(id).await?))
}

/// DELETE /requests/:id - unconditional; the listing's counter is not restored
pub async fn delete_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResult>> {
    let id = parse_id(&id)?;
    let result = state.requests.delete(id).await?;
    tracing::info!("Deleted request {} ({} removed)", id, result.deleted_count);
    Ok(Json(result))
}
