use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    DeleteResult, InsertResult, JoinRequest, Listing, ListingPayload, ListingStore, NewJoinRequest,
    NewListing, RequestStore, StoreError, UpdateResult,
};

/// In-process listings, kept in insertion order.
#[derive(Default)]
pub struct MemoryListingStore {
    listings: RwLock<Vec<Listing>>,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn insert(&self, listing: NewListing) -> Result<InsertResult, StoreError> {
        let id = Uuid::new_v4();
        self.listings.write().await.push(listing.into_listing(id));
        Ok(InsertResult::new(id))
    }

    async fn search(&self, title: Option<&str>) -> Result<Vec<Listing>, StoreError> {
        let listings = self.listings.read().await;
        Ok(listings
            .iter()
            .filter(|l| title.map_or(true, |needle| l.matches_title(needle)))
            .cloned()
            .collect())
    }

    async fn by_organizer(&self, email: &str) -> Result<Vec<Listing>, StoreError> {
        let listings = self.listings.read().await;
        Ok(listings
            .iter()
            .filter(|l| l.organizer_email == email)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        let listings = self.listings.read().await;
        Ok(listings.iter().find(|l| l.id == id).cloned())
    }

    async fn upsert(&self, id: Uuid, patch: ListingPayload) -> Result<UpdateResult, StoreError> {
        let mut listings = self.listings.write().await;
        if let Some(listing) = listings.iter_mut().find(|l| l.id == id) {
            let modified = listing.apply(patch);
            return Ok(UpdateResult::matched(1, modified as u64));
        }

        listings.push(patch.into_new()?.into_listing(id));
        Ok(UpdateResult::upserted(id))
    }

    async fn upcoming(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Listing>, StoreError> {
        let listings = self.listings.read().await;
        let mut upcoming: Vec<Listing> = listings
            .iter()
            .filter(|l| l.deadline >= now)
            .cloned()
            .collect();
        // stable: equal deadlines keep insertion order
        upcoming.sort_by_key(|l| l.deadline);
        upcoming.truncate(limit);
        Ok(upcoming)
    }

    async fn adjust_slots(&self, id: Uuid, delta: i64) -> Result<UpdateResult, StoreError> {
        let mut listings = self.listings.write().await;
        match listings.iter_mut().find(|l| l.id == id) {
            Some(listing) => {
                listing.volunteers_needed = listing
                    .volunteers_needed
                    .checked_add(delta)
                    .ok_or(StoreError::SlotOverflow(id))?;
                Ok(UpdateResult::matched(1, (delta != 0) as u64))
            }
            None => Ok(UpdateResult::matched(0, 0)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<DeleteResult, StoreError> {
        let mut listings = self.listings.write().await;
        let before = listings.len();
        listings.retain(|l| l.id != id);
        Ok(DeleteResult::new((before - listings.len()) as u64))
    }
}

/// In-process join requests, kept in insertion order.
#[derive(Default)]
pub struct MemoryRequestStore {
    requests: RwLock<Vec<JoinRequest>>,
}

impl MemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn insert(&self, request: NewJoinRequest) -> Result<InsertResult, StoreError> {
        let id = Uuid::new_v4();
        self.requests.write().await.push(request.into_request(id));
        Ok(InsertResult::new(id))
    }

    async fn all(&self) -> Result<Vec<JoinRequest>, StoreError> {
        Ok(self.requests.read().await.clone())
    }

    async fn by_volunteer(&self, email: &str) -> Result<Vec<JoinRequest>, StoreError> {
        let requests = self.requests.read().await;
        Ok(requests
            .iter()
            .filter(|r| r.volunteer_email == email)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<JoinRequest>, StoreError> {
        let requests = self.requests.read().await;
        Ok(requests.iter().find(|r| r.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<DeleteResult, StoreError> {
        let mut requests = self.requests.write().await;
        let before = requests.len();
        requests.retain(|r| r.id != id);
        Ok(DeleteResult::new((before - requests.len()) as u64))
    }
}
