//! Community wall message (mensaje).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Resource};
use crate::db::SortOrder;

/// Counter changed only through the atomic increment.
pub const LIKES_FIELD: &str = "likes";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texto: Option<String>,
    #[serde(with = "timestamp")]
    pub fecha: DateTime<Utc>,
    #[serde(default)]
    pub likes: i64,
}

/// Request body for posting a message.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub texto: Option<String>,
}

/// Editable message fields. `likes` is deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMessageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texto: Option<String>,
}

/// Body of `PUT /api/mensajes/{id}`: either field edits or an
/// increment directive such as `{"$inc": {"likes": 1}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageUpdate {
    #[serde(flatten)]
    pub fields: UpdateMessageRequest,
    #[serde(rename = "$inc", default)]
    pub increment: Option<LikeIncrement>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LikeIncrement {
    pub likes: i64,
}

impl Resource for Message {
    const COLLECTION: &'static str = "mensajes";
    const LABEL: &'static str = "Message";

    type Create = CreateMessageRequest;
    type Update = UpdateMessageRequest;

    fn create(request: CreateMessageRequest, now: DateTime<Utc>) -> Self {
        Message {
            texto: request.texto,
            fecha: now,
            likes: 0,
        }
    }

    fn list_order() -> Option<SortOrder> {
        Some(SortOrder::descending("fecha"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_increment_directive() {
        let update: MessageUpdate =
            serde_json::from_value(json!({ "$inc": { "likes": 1 } })).unwrap();
        assert_eq!(update.increment.map(|inc| inc.likes), Some(1));
        assert!(update.fields.texto.is_none());
    }

    #[test]
    fn test_parse_plain_edit() {
        let update: MessageUpdate =
            serde_json::from_value(json!({ "texto": "editado", "likes": 99 })).unwrap();
        assert!(update.increment.is_none());
        assert_eq!(update.fields.texto.as_deref(), Some("editado"));
    }

    #[test]
    fn test_increment_of_other_fields_rejected() {
        let parsed: Result<MessageUpdate, _> =
            serde_json::from_value(json!({ "$inc": { "views": 1 } }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_timestamp_round_trips_with_millis() {
        let message = Message::create(CreateMessageRequest { texto: None }, Utc::now());
        let value = serde_json::to_value(&message).unwrap();
        let fecha = value["fecha"].as_str().unwrap();
        assert_eq!(fecha.len(), "2026-10-17T09:30:00.123Z".len());
        assert!(fecha.ends_with('Z'));
        assert_eq!(value["likes"], 0);
        assert!(value.get("texto").is_none());
    }
}
