use axum::{
    extract::{Extension, Path, State},
    response::Json,
};

use crate::database::{InsertResult, JoinRequest, JoinRequestPayload};
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::server::AppState;
use crate::services::submit_request;

/// POST /add-requests - store a join request and take a slot off its listing
///
/// Responds with the insert result even when the slot decrement fails; see
/// [`submit_request`].
pub async fn add_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<JoinRequestPayload>,
) -> ApiResult<Json<InsertResult>> {
    user.authorize(&payload)?;

    let submission = submit_request(
        state.listings.as_ref(),
        state.requests.as_ref(),
        payload.into_new()?,
    )
    .await?;

    tracing::info!(
        "{} submitted request {} (slot taken: {})",
        user.email(),
        submission.inserted.inserted_id,
        submission.decremented()
    );
    Ok(Json(submission.inserted))
}

/// GET /requests-email/:email - the caller's own requests
pub async fn requests_by_email(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<JoinRequest>>> {
    user.authorize(&email)?;
    Ok(Json(state.requests.by_volunteer(&email).await?))
}
