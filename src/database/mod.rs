pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use manager::DatabaseManager;
pub use memory::{MemoryListingStore, MemoryRequestStore};
pub use models::{
    DeleteResult, InsertResult, JoinRequest, JoinRequestPayload, Listing, ListingPayload,
    NewJoinRequest, NewListing, UpdateResult,
};
pub use postgres::{PgListingStore, PgRequestStore};

/// Upper bound on `/volunteer-needs` results.
pub const UPCOMING_NEEDS_LIMIT: usize = 6;

/// Errors from the listing and request stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Slot counter of listing {0} would leave the BIGINT range")]
    SlotOverflow(Uuid),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Parses a path identifier into the store's id type.
pub fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw.trim()).map_err(|_| StoreError::InvalidId(raw.to_string()))
}

/// Volunteer listings namespace.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert(&self, listing: NewListing) -> Result<InsertResult, StoreError>;

    /// All listings, optionally restricted to titles containing `title`
    /// (case-insensitive, literal substring).
    async fn search(&self, title: Option<&str>) -> Result<Vec<Listing>, StoreError>;

    async fn by_organizer(&self, email: &str) -> Result<Vec<Listing>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Listing>, StoreError>;

    /// `$set`-style update of the listing at `id`, inserting it when absent.
    async fn upsert(&self, id: Uuid, patch: ListingPayload) -> Result<UpdateResult, StoreError>;

    /// Listings with deadline >= `now`, earliest first, at most `limit`.
    async fn upcoming(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Listing>, StoreError>;

    /// Adds `delta` to the remaining-slots counter. No floor is enforced.
    async fn adjust_slots(&self, id: Uuid, delta: i64) -> Result<UpdateResult, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<DeleteResult, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Join requests namespace.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: NewJoinRequest) -> Result<InsertResult, StoreError>;

    async fn all(&self) -> Result<Vec<JoinRequest>, StoreError>;

    async fn by_volunteer(&self, email: &str) -> Result<Vec<JoinRequest>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<JoinRequest>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<DeleteResult, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_id("64f1c2e9a1b2c3d4e5f60718"), Err(StoreError::InvalidId(_))));
    }
}
