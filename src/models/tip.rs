//! Community tip (consejo).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Resource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tip {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texto: Option<String>,
    #[serde(with = "timestamp")]
    pub fecha: DateTime<Utc>,
}

/// Request body for creating a tip.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTipRequest {
    #[serde(default)]
    pub texto: Option<String>,
}

/// Request body for editing a tip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTipRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texto: Option<String>,
}

impl Resource for Tip {
    const COLLECTION: &'static str = "consejos";
    const LABEL: &'static str = "Tip";

    type Create = CreateTipRequest;
    type Update = UpdateTipRequest;

    fn create(request: CreateTipRequest, now: DateTime<Utc>) -> Self {
        Tip {
            texto: request.texto,
            fecha: now,
        }
    }
}
