//! Serde adapters for `postDeadline`.
//!
//! Deadlines go out as epoch milliseconds. On the way in we accept
//! milliseconds (integer or float, as a browser `Date.getTime()` produces),
//! numeric strings and RFC 3339 timestamps.

use chrono::{DateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDeadline {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl RawDeadline {
    fn into_datetime<E: de::Error>(self) -> Result<DateTime<Utc>, E> {
        let millis = match self {
            RawDeadline::Millis(ms) => ms,
            RawDeadline::Fractional(ms) => ms as i64,
            RawDeadline::Text(text) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
                    return Ok(dt.with_timezone(&Utc));
                }
                text.trim()
                    .parse::<i64>()
                    .map_err(|_| E::custom(format!("invalid deadline: {}", text)))?
            }
        };
        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| E::custom(format!("deadline out of range: {}", millis)))
    }
}

pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(value.timestamp_millis())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    RawDeadline::deserialize(deserializer)?.into_datetime()
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_some(&dt.timestamp_millis()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<RawDeadline>::deserialize(deserializer)?
            .map(RawDeadline::into_datetime)
            .transpose()
    }
}
