// Validation outcomes and normalized records

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event emitted when a payload passes validation.
pub const VALIDATED: &str = "validated";

/// Event emitted when a payload fails validation.
pub const INVALID: &str = "invalid";

/// Prefix of validation request events.
pub const VALIDATE_PREFIX: &str = "validate:";

/// Name of the request event for `domain`, e.g. `validate:ingest`.
pub fn validate_event(domain: &str) -> String {
    format!("{VALIDATE_PREFIX}{domain}")
}

/// The single result of one validation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Validated { domain: String, clean: Clean },
    Invalid { domain: String, errors: Vec<String> },
}

impl Outcome {
    /// Domain that produced this outcome
    pub fn domain(&self) -> &str {
        match self {
            Outcome::Validated { domain, .. } | Outcome::Invalid { domain, .. } => domain,
        }
    }

    /// Event this outcome is emitted under
    pub fn event_name(&self) -> &'static str {
        match self {
            Outcome::Validated { .. } => VALIDATED,
            Outcome::Invalid { .. } => INVALID,
        }
    }

    pub fn is_validated(&self) -> bool {
        matches!(self, Outcome::Validated { .. })
    }

    /// Normalized record, if validated
    pub fn clean(&self) -> Option<&Clean> {
        match self {
            Outcome::Validated { clean, .. } => Some(clean),
            Outcome::Invalid { .. } => None,
        }
    }

    /// Rule failures, if invalid
    pub fn errors(&self) -> Option<&[String]> {
        match self {
            Outcome::Invalid { errors, .. } => Some(errors),
            Outcome::Validated { .. } => None,
        }
    }
}

/// Domain-specific normalized record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum Clean {
    Ingest(FlightEvent),
    Get(FlightKey),
    /// Record produced by a custom domain
    Other(Value),
}

impl Clean {
    pub fn as_ingest(&self) -> Option<&FlightEvent> {
        match self {
            Clean::Ingest(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_get(&self) -> Option<&FlightKey> {
        match self {
            Clean::Get(key) => Some(key),
            _ => None,
        }
    }

    /// JSON form of the record
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Normalized flight update accepted by the ingest domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub data: FlightData,
}

/// Flight fields carried by an ingest event.
///
/// `destination`, `status` and `gate` are kept verbatim, `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightData {
    pub flight_id: String,
    pub destination: Value,
    pub status: Value,
    pub gate: Value,
}

/// Normalized lookup key accepted by the get domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightKey {
    pub flight_id: String,
}
