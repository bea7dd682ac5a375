pub mod deadline;
pub mod listing;
pub mod request;

use serde::Serialize;
use uuid::Uuid;

pub use listing::{Listing, ListingPayload, NewListing};
pub use request::{JoinRequest, JoinRequestPayload, NewJoinRequest};

/// Result of a single insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: Uuid,
}

/// Result of a single update or upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<Uuid>,
}

/// Result of a single delete. Deleting an absent id reports zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl InsertResult {
    pub fn new(inserted_id: Uuid) -> Self {
        Self { acknowledged: true, inserted_id }
    }
}

impl UpdateResult {
    pub fn matched(matched: u64, modified: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count: matched,
            modified_count: modified,
            upserted_count: 0,
            upserted_id: None,
        }
    }

    pub fn upserted(id: Uuid) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 1,
            upserted_id: Some(id),
        }
    }
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self { acknowledged: true, deleted_count }
    }
}
