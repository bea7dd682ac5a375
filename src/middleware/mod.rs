pub mod auth;

pub use auth::{ensure_owner, require_auth, AuthUser, Owned, OWNER_CLAIM};
