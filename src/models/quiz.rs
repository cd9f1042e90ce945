//! Eco quiz result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Resource;

/// Scores from one quiz run.
///
/// `puntuacion_total` is computed by the client and stored as sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EcoTest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reciclaje: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transporte: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puntuacion_total: Option<i64>,
}

impl Resource for EcoTest {
    const COLLECTION: &'static str = "tests";
    const LABEL: &'static str = "Test";

    // Same shape on create and update: there are no server-assigned fields
    type Create = EcoTest;
    type Update = EcoTest;

    fn create(request: EcoTest, _now: DateTime<Utc>) -> Self {
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let parsed: EcoTest =
            serde_json::from_value(json!({ "reciclaje": 3, "transporte": 2, "puntuacionTotal": 5 }))
                .unwrap();
        assert_eq!(parsed.puntuacion_total, Some(5));

        let partial = serde_json::to_value(EcoTest {
            transporte: Some(1),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(partial, json!({ "transporte": 1 }));
    }
}
