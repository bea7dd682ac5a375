use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::{
    DeleteResult, InsertResult, JoinRequest, Listing, ListingPayload, ListingStore, NewJoinRequest,
    NewListing, RequestStore, StoreError, UpdateResult,
};

const LISTING_COLUMNS: &str =
    "id, title, organizer_email, volunteers_needed, post_deadline, details";
const REQUEST_COLUMNS: &str = "id, volunteer_email, job_id, details";

#[derive(Debug, FromRow)]
struct ListingRow {
    id: Uuid,
    title: String,
    organizer_email: String,
    volunteers_needed: i64,
    post_deadline: DateTime<Utc>,
    details: Json<Map<String, Value>>,
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        Listing {
            id: row.id,
            title: row.title,
            organizer_email: row.organizer_email,
            volunteers_needed: row.volunteers_needed,
            deadline: row.post_deadline,
            details: row.details.0,
        }
    }
}

#[derive(Debug, FromRow)]
struct RequestRow {
    id: Uuid,
    volunteer_email: String,
    job_id: String,
    details: Json<Map<String, Value>>,
}

impl From<RequestRow> for JoinRequest {
    fn from(row: RequestRow) -> Self {
        JoinRequest {
            id: row.id,
            volunteer_email: row.volunteer_email,
            job_id: row.job_id,
            details: row.details.0,
        }
    }
}

/// Listings in `volunteer.volunteer`
#[derive(Clone)]
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn select(&self, clause: &str, bind: Option<&str>) -> Result<Vec<Listing>, StoreError> {
        let sql = format!(
            "SELECT {} FROM volunteer.volunteer {} ORDER BY created_at, id",
            LISTING_COLUMNS, clause
        );
        let rows = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(bind)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Listing::from).collect())
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn insert(&self, listing: NewListing) -> Result<InsertResult, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO volunteer.volunteer
                (id, title, organizer_email, volunteers_needed, post_deadline, details)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(&listing.title)
        .bind(&listing.organizer_email)
        .bind(listing.volunteers_needed)
        .bind(listing.deadline)
        .bind(Json(&listing.details))
        .execute(&self.pool)
        .await?;
        Ok(InsertResult::new(id))
    }

    async fn search(&self, title: Option<&str>) -> Result<Vec<Listing>, StoreError> {
        // strpos keeps the search text literal: no LIKE wildcards to escape
        self.select(
            "WHERE ($1::text IS NULL OR strpos(lower(title), lower($1::text)) > 0)",
            title,
        )
        .await
    }

    async fn by_organizer(&self, email: &str) -> Result<Vec<Listing>, StoreError> {
        self.select("WHERE organizer_email = $1", Some(email)).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        let sql = format!("SELECT {} FROM volunteer.volunteer WHERE id = $1", LISTING_COLUMNS);
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Listing::from))
    }

    async fn upsert(&self, id: Uuid, patch: ListingPayload) -> Result<UpdateResult, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = match lock_listing(&mut *tx, id).await? {
            Some(listing) => merge_listing(&mut *tx, listing, patch).await?,
            None => {
                let listing = patch.clone().into_new()?;
                let inserted = sqlx::query(
                    "INSERT INTO volunteer.volunteer
                        (id, title, organizer_email, volunteers_needed, post_deadline, details)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     ON CONFLICT (id) DO NOTHING",
                )
                .bind(id)
                .bind(&listing.title)
                .bind(&listing.organizer_email)
                .bind(listing.volunteers_needed)
                .bind(listing.deadline)
                .bind(Json(&listing.details))
                .execute(&mut *tx)
                .await?
                .rows_affected();

                if inserted == 1 {
                    UpdateResult::upserted(id)
                } else {
                    // A concurrent upsert created the row first; merge into it instead
                    let existing = lock_listing(&mut *tx, id)
                        .await?
                        .ok_or(StoreError::Sqlx(sqlx::Error::RowNotFound))?;
                    merge_listing(&mut *tx, existing, patch).await?
                }
            }
        };

        tx.commit().await?;
        Ok(result)
    }

    async fn upcoming(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Listing>, StoreError> {
        let sql = format!(
            "SELECT {} FROM volunteer.volunteer
             WHERE post_deadline >= $1
             ORDER BY post_deadline ASC
             LIMIT $2",
            LISTING_COLUMNS
        );
        let rows = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(now)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Listing::from).collect())
    }

    async fn adjust_slots(&self, id: Uuid, delta: i64) -> Result<UpdateResult, StoreError> {
        let affected = sqlx::query(
            "UPDATE volunteer.volunteer
             SET volunteers_needed = volunteers_needed + $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // 22003: numeric_value_out_of_range
            let overflow = matches!(
                &e,
                sqlx::Error::Database(db) if db.code().as_deref() == Some("22003")
            );
            if overflow {
                StoreError::SlotOverflow(id)
            } else {
                StoreError::Sqlx(e)
            }
        })?
        .rows_affected();

        let modified = if delta == 0 { 0 } else { affected };
        Ok(UpdateResult::matched(affected, modified))
    }

    async fn delete(&self, id: Uuid) -> Result<DeleteResult, StoreError> {
        let affected = sqlx::query("DELETE FROM volunteer.volunteer WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(DeleteResult::new(affected))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

async fn lock_listing(conn: &mut PgConnection, id: Uuid) -> Result<Option<Listing>, StoreError> {
    let sql = format!(
        "SELECT {} FROM volunteer.volunteer WHERE id = $1 FOR UPDATE",
        LISTING_COLUMNS
    );
    let row = sqlx::query_as::<_, ListingRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Listing::from))
}

/// Applies `patch` to a locked listing, writing only when something changed.
async fn merge_listing(
    conn: &mut PgConnection,
    mut listing: Listing,
    patch: ListingPayload,
) -> Result<UpdateResult, StoreError> {
    if !listing.apply(patch) {
        return Ok(UpdateResult::matched(1, 0));
    }
    sqlx::query(
        "UPDATE volunteer.volunteer
         SET title = $2, organizer_email = $3, volunteers_needed = $4,
             post_deadline = $5, details = $6
         WHERE id = $1",
    )
    .bind(listing.id)
    .bind(&listing.title)
    .bind(&listing.organizer_email)
    .bind(listing.volunteers_needed)
    .bind(listing.deadline)
    .bind(Json(&listing.details))
    .execute(conn)
    .await?;
    Ok(UpdateResult::matched(1, 1))
}

/// Join requests in `requests.requests`
#[derive(Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn insert(&self, request: NewJoinRequest) -> Result<InsertResult, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO requests.requests (id, volunteer_email, job_id, details)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(&request.volunteer_email)
        .bind(&request.job_id)
        .bind(Json(&request.details))
        .execute(&self.pool)
        .await?;
        Ok(InsertResult::new(id))
    }

    async fn all(&self) -> Result<Vec<JoinRequest>, StoreError> {
        let sql = format!(
            "SELECT {} FROM requests.requests ORDER BY created_at, id",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, RequestRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(JoinRequest::from).collect())
    }

    async fn by_volunteer(&self, email: &str) -> Result<Vec<JoinRequest>, StoreError> {
        let sql = format!(
            "SELECT {} FROM requests.requests WHERE volunteer_email = $1 ORDER BY created_at, id",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(JoinRequest::from).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<JoinRequest>, StoreError> {
        let sql = format!("SELECT {} FROM requests.requests WHERE id = $1", REQUEST_COLUMNS);
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(JoinRequest::from))
    }

    async fn delete(&self, id: Uuid) -> Result<DeleteResult, StoreError> {
        let affected = sqlx::query("DELETE FROM requests.requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(DeleteResult::new(affected))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
