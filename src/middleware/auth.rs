use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{token_from_headers, Claims};
use crate::database::{JoinRequestPayload, ListingPayload};
use crate::error::ApiError;
use crate::server::AppState;

/// Claim compared against resource owners.
pub const OWNER_CLAIM: &str = "email";

/// Authenticated caller extracted from the session cookie
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn email(&self) -> &str {
        &self.claims.email
    }

    /// Owner check against the email claim.
    pub fn authorize<R: Owned + ?Sized>(&self, resource: &R) -> Result<(), ApiError> {
        ensure_owner(self, OWNER_CLAIM, resource)
    }
}

/// Anything with an owner field the caller can be checked against.
pub trait Owned {
    fn owner(&self) -> Option<&str>;
}

impl Owned for str {
    fn owner(&self) -> Option<&str> {
        Some(self)
    }
}

impl Owned for String {
    fn owner(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl Owned for ListingPayload {
    fn owner(&self) -> Option<&str> {
        self.organizer_email.as_deref()
    }
}

impl Owned for JoinRequestPayload {
    fn owner(&self) -> Option<&str> {
        self.volunteer_email.as_deref()
    }
}

/// Fails with Forbidden unless `claim` on the caller equals the resource's
/// owner field. A missing claim or owner never matches.
pub fn ensure_owner<R: Owned + ?Sized>(
    user: &AuthUser,
    claim: &str,
    resource: &R,
) -> Result<(), ApiError> {
    match (user.claims.get(claim), resource.owner()) {
        (Some(caller), Some(owner)) if caller == owner => Ok(()),
        (caller, owner) => {
            tracing::warn!(
                "Ownership check failed: {} {:?} does not own {:?}",
                claim,
                caller,
                owner
            );
            Err(ApiError::forbidden())
        }
    }
}

/// Cookie authentication middleware: validates the `token` cookie and
/// injects [`AuthUser`] into request extensions
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(request.headers()).ok_or_else(|| {
        tracing::debug!("No session cookie on {}", request.uri().path());
        ApiError::unauthorized()
    })?;

    let claims = state.tokens.verify(&token).map_err(|e| {
        tracing::debug!("Session cookie rejected: {}", e);
        ApiError::unauthorized()
    })?;

    tracing::debug!("Authenticated {}", claims.email);
    request.extensions_mut().insert(AuthUser { claims });

    Ok(next.run(request).await)
}
