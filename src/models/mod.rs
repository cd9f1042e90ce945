//! Data models for the EcoAmigo application.
//!
//! Each resource kind is a typed document stored in its own collection.
//! Client-supplied fields are optional: missing fields are stored as absent.

mod ack;
mod message;
mod quiz;
mod tip;
mod tracking;

pub use ack::*;
pub use message::*;
pub use quiz::*;
pub use tip::*;
pub use tracking::*;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::db::SortOrder;

/// A document kind exposed through the generic CRUD handlers.
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name, also used as the API path segment.
    const COLLECTION: &'static str;
    /// Human readable name for log messages.
    const LABEL: &'static str;

    /// Body accepted on creation.
    type Create: DeserializeOwned + Send + 'static;
    /// Partial fields accepted on update.
    type Update: Serialize + DeserializeOwned + Send + 'static;

    /// Build the stored document, stamping server-assigned fields.
    fn create(request: Self::Create, now: DateTime<Utc>) -> Self;

    fn list_order() -> Option<SortOrder> {
        None
    }
}

/// Serde adapter for server timestamps.
///
/// Always millisecond precision in UTC, so stored values sort as text.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
