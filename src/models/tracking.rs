//! Habit tracking entry (seguimiento).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Resource};

/// Habit area a tracking entry belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Reciclaje,
    Energia,
    Transporte,
    Agua,
    Otros,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categoria: Option<Category>,
    #[serde(with = "timestamp")]
    pub fecha: DateTime<Utc>,
    #[serde(default)]
    pub cumplido: bool,
}

/// Request body for creating a tracking entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTrackingRequest {
    #[serde(default)]
    pub texto: Option<String>,
    #[serde(default)]
    pub categoria: Option<Category>,
}

/// Request body for editing a tracking entry or marking it done.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTrackingRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categoria: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumplido: Option<bool>,
}

impl Resource for TrackingEntry {
    const COLLECTION: &'static str = "seguimientos";
    const LABEL: &'static str = "Tracking entry";

    type Create = CreateTrackingRequest;
    type Update = UpdateTrackingRequest;

    fn create(request: CreateTrackingRequest, now: DateTime<Utc>) -> Self {
        TrackingEntry {
            texto: request.texto,
            categoria: request.categoria,
            fecha: now,
            cumplido: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_stamps_defaults() {
        let request: CreateTrackingRequest =
            serde_json::from_value(json!({ "texto": "Ducha corta", "categoria": "agua" })).unwrap();
        let now = Utc::now();
        let entry = TrackingEntry::create(request, now);

        assert_eq!(entry.categoria, Some(Category::Agua));
        assert!(!entry.cumplido);
        assert_eq!(entry.fecha, now);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let parsed: Result<CreateTrackingRequest, _> =
            serde_json::from_value(json!({ "texto": "x", "categoria": "plastico" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_update_serializes_only_present_fields() {
        let update = UpdateTrackingRequest {
            cumplido: Some(true),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(update).unwrap(), json!({ "cumplido": true }));
    }
}
