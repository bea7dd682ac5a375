use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::deadline;
use crate::database::StoreError;

/// A volunteer-needed post owned by an organizer.
///
/// Field names on the wire follow the front end (`OrganizerEmail`,
/// `noOfVolunteerNeed`, `postDeadline`); anything else the client sends is
/// kept in `details` and echoed back flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "OrganizerEmail")]
    pub organizer_email: String,
    #[serde(rename = "noOfVolunteerNeed")]
    pub volunteers_needed: i64,
    #[serde(rename = "postDeadline", with = "deadline")]
    pub deadline: DateTime<Utc>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// A fully specified listing ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub title: String,
    pub organizer_email: String,
    pub volunteers_needed: i64,
    pub deadline: DateTime<Utc>,
    pub details: Map<String, Value>,
}

/// Listing JSON as submitted by a client: every field may be absent.
///
/// Used directly as the `$set`-style patch for upserts, and converted into a
/// [`NewListing`] for inserts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "OrganizerEmail", default, skip_serializing_if = "Option::is_none")]
    pub organizer_email: Option<String>,
    #[serde(rename = "noOfVolunteerNeed", default, skip_serializing_if = "Option::is_none")]
    pub volunteers_needed: Option<i64>,
    #[serde(
        rename = "postDeadline",
        default,
        with = "deadline::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ListingPayload {
    /// Drops client-supplied identifiers; the store owns `_id`.
    pub fn without_id(mut self) -> Self {
        self.details.remove("_id");
        self
    }

    pub fn into_new(self) -> Result<NewListing, StoreError> {
        let payload = self.without_id();
        Ok(NewListing {
            title: payload.title.ok_or(StoreError::MissingField("title"))?,
            organizer_email: payload
                .organizer_email
                .ok_or(StoreError::MissingField("OrganizerEmail"))?,
            volunteers_needed: payload
                .volunteers_needed
                .ok_or(StoreError::MissingField("noOfVolunteerNeed"))?,
            deadline: payload.deadline.ok_or(StoreError::MissingField("postDeadline"))?,
            details: payload.details,
        })
    }
}

impl NewListing {
    pub fn into_listing(self, id: Uuid) -> Listing {
        Listing {
            id,
            title: self.title,
            organizer_email: self.organizer_email,
            volunteers_needed: self.volunteers_needed,
            deadline: self.deadline,
            details: self.details,
        }
    }
}

impl Listing {
    /// Applies a patch with `$set` semantics. Returns whether anything changed.
    pub fn apply(&mut self, patch: ListingPayload) -> bool {
        let before = self.clone();
        let patch = patch.without_id();

        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(email) = patch.organizer_email {
            self.organizer_email = email;
        }
        if let Some(needed) = patch.volunteers_needed {
            self.volunteers_needed = needed;
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = deadline;
        }
        self.details.extend(patch.details);

        *self != before
    }

    pub fn matches_title(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(&needle.to_lowercase())
    }
}
