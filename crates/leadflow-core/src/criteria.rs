//! Lead search criteria submitted with a pipeline.
//!
//! Criteria are opaque to this application except for two keys:
//! `hasEmail`, which must be `true` for email campaigns, and
//! `totalResults`, which becomes the pipeline's target lead count.

use serde_json::Value;
use thiserror::Error;

use crate::pipeline::CampaignKind;

const HAS_EMAIL_KEY: &str = "hasEmail";
const TOTAL_RESULTS_KEY: &str = "totalResults";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error("search criteria are required")]
    Empty,
    #[error("search criteria are not valid JSON: {0}")]
    InvalidJson(String),
    #[error("email campaigns require \"hasEmail\": true in the search criteria")]
    HasEmailRequired,
}

/// Parses raw criteria text and applies the campaign-kind rules.
///
/// # Errors
///
/// - [`CriteriaError::Empty`] if the text is blank.
/// - [`CriteriaError::InvalidJson`] if it does not parse.
/// - [`CriteriaError::HasEmailRequired`] if `kind` is email and the parsed
///   criteria do not contain a boolean `hasEmail` set to `true`.
pub fn parse_criteria(raw: &str, kind: CampaignKind) -> Result<Value, CriteriaError> {
    if raw.trim().is_empty() {
        return Err(CriteriaError::Empty);
    }

    let value: Value =
        serde_json::from_str(raw).map_err(|e| CriteriaError::InvalidJson(e.to_string()))?;

    if kind == CampaignKind::Email && !guarantees_email(&value) {
        return Err(CriteriaError::HasEmailRequired);
    }

    Ok(value)
}

fn guarantees_email(criteria: &Value) -> bool {
    criteria.get(HAS_EMAIL_KEY).and_then(Value::as_bool) == Some(true)
}

/// Target lead count carried by `totalResults`, when it is a positive integer.
#[must_use]
pub fn target_lead_count(criteria: &Value) -> Option<i32> {
    criteria
        .get(TOTAL_RESULTS_KEY)
        .and_then(Value::as_i64)
        .filter(|n| *n > 0)
        .and_then(|n| i32::try_from(n).ok())
}
