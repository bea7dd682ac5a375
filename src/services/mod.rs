pub mod request_service;

pub use request_service::{submit_request, Submission};
