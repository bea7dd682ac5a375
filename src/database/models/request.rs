use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::StoreError;

/// A volunteer's application against a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "volunteerEmail")]
    pub volunteer_email: String,
    /// Listing identifier as sent by the client; not checked on insert.
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewJoinRequest {
    pub volunteer_email: String,
    pub job_id: String,
    pub details: Map<String, Value>,
}

/// Request JSON as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinRequestPayload {
    #[serde(rename = "volunteerEmail", default, skip_serializing_if = "Option::is_none")]
    pub volunteer_email: Option<String>,
    #[serde(rename = "jobId", default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl JoinRequestPayload {
    pub fn into_new(mut self) -> Result<NewJoinRequest, StoreError> {
        self.details.remove("_id");
        Ok(NewJoinRequest {
            volunteer_email: self
                .volunteer_email
                .ok_or(StoreError::MissingField("volunteerEmail"))?,
            job_id: self.job_id.ok_or(StoreError::MissingField("jobId"))?,
            details: self.details,
        })
    }
}

impl NewJoinRequest {
    pub fn into_request(self, id: Uuid) -> JoinRequest {
        JoinRequest {
            id,
            volunteer_email: self.volunteer_email,
            job_id: self.job_id,
            details: self.details,
        }
    }

    /// The referenced listing id, if `jobId` is a well-formed identifier.
    pub fn listing_id(&self) -> Result<Uuid, StoreError> {
        Uuid::parse_str(&self.job_id).map_err(|_| StoreError::InvalidId(self.job_id.clone()))
    }
}
