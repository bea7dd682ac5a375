// handlers/protected/mod.rs - Protected handlers (session cookie required)
//
// Every handler here receives the caller as `Extension<AuthUser>` and checks
// ownership before touching storage.

pub mod requests;
pub mod volunteer;

pub use requests::{add_request, requests_by_email};
pub use volunteer::{add_volunteer, update_volunteer, volunteers_by_email};
