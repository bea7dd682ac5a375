use crate::database::{
    InsertResult, ListingStore, NewJoinRequest, RequestStore, StoreError, UpdateResult,
};

/// Outcome of [`submit_request`]. The two phases succeed or fail
/// independently; nothing is rolled back.
#[derive(Debug)]
pub struct Submission {
    pub inserted: InsertResult,
    pub slot_update: Result<UpdateResult, StoreError>,
}

impl Submission {
    /// True when exactly one listing had its counter decremented.
    pub fn decremented(&self) -> bool {
        matches!(&self.slot_update, Ok(update) if update.modified_count == 1)
    }
}

/// Stores a join request, then takes one slot off the referenced listing.
///
/// Phase one failing aborts with its error. Phase two is best-effort: a
/// malformed `jobId`, a missing listing or a storage error is reported in
/// [`Submission::slot_update`] while the request stays stored. Concurrent
/// submissions can drive the counter below zero.
pub async fn submit_request(
    listings: &dyn ListingStore,
    requests: &dyn RequestStore,
    request: NewJoinRequest,
) -> Result<Submission, StoreError> {
    let listing_id = request.listing_id();
    let inserted = requests.insert(request).await?;

    let slot_update = match listing_id {
        Ok(id) => listings.adjust_slots(id, -1).await,
        Err(e) => Err(e),
    };

    match &slot_update {
        Ok(update) if update.matched_count == 0 => {
            tracing::warn!(
                "Request {} references a listing that does not exist",
                inserted.inserted_id
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(
                "Request {} stored but slot decrement failed: {}",
                inserted.inserted_id,
                e
            );
        }
    }

    Ok(Submission {
        inserted,
        slot_update,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryListingStore, MemoryRequestStore, NewListing};
    use chrono::Utc;
    use serde_json::Map;
    use uuid::Uuid;

    async fn seeded() -> (MemoryListingStore, MemoryRequestStore, Uuid) {
        let listings = MemoryListingStore::new();
        let id = listings
            .insert(NewListing {
                title: "Blood drive".into(),
                organizer_email: "org@example.com".into(),
                volunteers_needed: 3,
                deadline: Utc::now(),
                details: Map::new(),
            })
            .await
            .unwrap()
            .inserted_id;
        (listings, MemoryRequestStore::new(), id)
    }

    fn request(job_id: &str) -> NewJoinRequest {
        NewJoinRequest {
            volunteer_email: "vol@example.com".into(),
            job_id: job_id.to_string(),
            details: Map::new(),
        }
    }

    #[tokio::test]
    async fn decrements_referenced_listing_by_one() {
        let (listings, requests, id) = seeded().await;

        let submission = submit_request(&listings, &requests, request(&id.to_string()))
            .await
            .unwrap();

        assert!(submission.decremented());
        assert_eq!(listings.get(id).await.unwrap().unwrap().volunteers_needed, 2);
        assert!(requests.get(submission.inserted.inserted_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn malformed_job_id_keeps_request() {
        let (listings, requests, id) = seeded().await;

        let submission = submit_request(&listings, &requests, request("abc"))
            .await
            .unwrap();

        assert!(matches!(submission.slot_update, Err(StoreError::InvalidId(_))));
        assert_eq!(requests.all().await.unwrap().len(), 1);
        assert_eq!(listings.get(id).await.unwrap().unwrap().volunteers_needed, 3);
    }

    #[tokio::test]
    async fn unknown_listing_matches_nothing() {
        let (listings, requests, _) = seeded().await;

        let submission = submit_request(&listings, &requests, request(&Uuid::new_v4().to_string()))
            .await
            .unwrap();

        assert!(!submission.decremented());
        assert_eq!(submission.slot_update.unwrap().matched_count, 0);
    }

    #[tokio::test]
    async fn counter_overflow_keeps_request() {
        let listings = MemoryListingStore::new();
        let id = listings
            .insert(NewListing {
                title: "Edge".into(),
                organizer_email: "org@example.com".into(),
                volunteers_needed: i64::MIN,
                deadline: Utc::now(),
                details: Map::new(),
            })
            .await
            .unwrap()
            .inserted_id;
        let requests = MemoryRequestStore::new();

        let submission = submit_request(&listings, &requests, request(&id.to_string()))
            .await
            .unwrap();

        assert!(matches!(submission.slot_update, Err(StoreError::SlotOverflow(_))));
        assert!(requests.get(submission.inserted.inserted_id).await.unwrap().is_some());
    }
}
