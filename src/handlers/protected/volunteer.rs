use axum::{
    extract::{Extension, Path, State},
    response::Json,
};

use crate::database::{parse_id, InsertResult, Listing, ListingPayload, UpdateResult};
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::server::AppState;

/// POST /add-volunteer - create a listing owned by the caller
pub async fn add_volunteer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ListingPayload>,
) -> ApiResult<Json<InsertResult>> {
    user.authorize(&payload)?;

    let result = state.listings.insert(payload.into_new()?).await?;
    tracing::info!("{} created listing {}", user.email(), result.inserted_id);
    Ok(Json(result))
}

/// GET /volunteer-email/:email - the caller's own listings
pub async fn volunteers_by_email(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<Listing>>> {
    user.authorize(&email)?;
    Ok(Json(state.listings.by_organizer(&email).await?))
}

/// PUT /update-volunteer/:id - `$set` the posted fields, creating the
/// listing when the id is unknown
///
/// Ownership is checked against the body's `OrganizerEmail`, not the stored
/// listing.
pub async fn update_volunteer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<ListingPayload>,
) -> ApiResult<Json<UpdateResult>> {
    user.authorize(&payload)?;

    let id = parse_id(&id)?;
    let result = state.listings.upsert(id, payload).await?;
    tracing::info!(
        "{} updated listing {} (matched={}, upserted={})",
        user.email(),
        id,
        result.matched_count,
        result.upserted_count
    );
    Ok(Json(result))
}
