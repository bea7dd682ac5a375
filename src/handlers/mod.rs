// handlers/mod.rs - two security tiers
//
// Public (no auth) → Protected (session cookie + owner checks)
pub mod public;    // Token acquisition and open reads/deletes
pub mod protected; // Requires a valid `token` cookie; see middleware::require_auth
