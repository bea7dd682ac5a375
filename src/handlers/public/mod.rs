// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Session cookie issue/clear, plus the reads and deletes the front end
// performs without a session.

pub mod requests;
pub mod session;
pub mod volunteer;

pub use requests::{delete_request, get_request, list_requests};
pub use session::{issue_token, logout};
pub use volunteer::{delete_volunteer, get_volunteer, list_volunteers, volunteer_needs};
