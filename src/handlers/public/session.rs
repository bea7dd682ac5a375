use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Json},
};
use serde_json::{json, Map, Value};

use crate::error::ApiResult;
use crate::server::AppState;

/// POST /jwt - sign the posted claims and set the `token` cookie
///
/// Expected Input:
/// ```json
/// { "email": "user@example.com", "...": "any other claims" }
/// ```
pub async fn issue_token(
    State(state): State<AppState>,
    Json(claims): Json<Map<String, Value>>,
) -> ApiResult<impl IntoResponse> {
    let token = state.tokens.issue(claims)?;
    tracing::info!("Issued session token");

    Ok((
        [(SET_COOKIE, state.tokens.session_cookie(&token))],
        Json(json!({ "success": true })),
    ))
}

/// POST /logout - clear the `token` cookie
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, state.tokens.cleared_cookie())],
        Json(json!({ "success": true })),
    )
}
