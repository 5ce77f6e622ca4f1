//! Body posted to the workflow engine when a campaign is launched.
//!
//! The key names are the engine's contract and are kept as-is.

use chrono::{DateTime, SecondsFormat, Utc};
use leadflow_core::Pipeline;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROCESS_PIPELINE_ACTION: &str = "process_pipeline_criteria";

const REQUIRED_FIELDS: [&str; 3] = ["id", "nom", "url"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub id: String,
    /// Pipeline name.
    pub nom: String,
    /// Serialized search criteria.
    pub url: String,
    /// Free-text instruction.
    pub consigne: String,
    /// `"email"` or `"linkedin"`.
    pub type_de_campagne: String,
    /// Cold-email platform campaign id; empty for network campaigns.
    pub id_campagne: String,
    pub timestamp: String,
    pub action: String,
}

impl WebhookPayload {
    #[must_use]
    pub fn for_pipeline(pipeline: &Pipeline, now: DateTime<Utc>) -> Self {
        Self {
            id: pipeline.id.to_string(),
            nom: pipeline.name.clone(),
            url: pipeline.criteria.clone(),
            consigne: pipeline.instruction.clone(),
            type_de_campagne: pipeline.campaign_kind.as_str().to_string(),
            id_campagne: pipeline.external_campaign_id.clone(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            action: PROCESS_PIPELINE_ACTION.to_string(),
        }
    }
}

/// Whether a raw body carries non-empty `id`, `nom`, and `url`.
///
/// Null, `false`, `0`, and the empty string all count as absent.
#[must_use]
pub fn has_required_fields(body: &Value) -> bool {
    REQUIRED_FIELDS
        .iter()
        .all(|field| body.get(field).is_some_and(is_truthy))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
