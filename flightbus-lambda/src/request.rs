//! Inbound event shapes.
//!
//! Only the fields the handlers read are modelled; everything else in the
//! Lambda payload is ignored on deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// API Gateway proxy request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayEvent {
    /// Raw request body.
    #[serde(default)]
    pub body: Option<String>,
    /// Path parameters; absent for collection routes.
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
}

impl ApiGatewayEvent {
    /// Request carrying `body`.
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Request with a single path parameter.
    pub fn with_path_parameter(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path_parameters: Some(HashMap::from([(name.into(), value.into())])),
            ..Self::default()
        }
    }

    /// Get a path parameter.
    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
    }

    /// Parse the body as JSON; a missing or empty body is `{}`.
    pub fn json_body(&self) -> serde_json::Result<Value> {
        parse_or_empty(self.body.as_deref())
    }
}

/// EventBridge event delivered to a rule target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventBridgeEvent {
    #[serde(default)]
    pub detail: Option<Value>,
    #[serde(rename = "detail-type", default)]
    pub detail_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// SQS batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsRecord>,
}

/// One SQS message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsRecord {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl SqsRecord {
    /// Record carrying `body`.
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Parse the body as JSON; a missing or empty body is `{}`.
    pub fn json_body(&self) -> serde_json::Result<Value> {
        parse_or_empty(self.body.as_deref())
    }
}

fn parse_or_empty(body: Option<&str>) -> serde_json::Result<Value> {
    match body {
        Some(text) if !text.is_empty() => serde_json::from_str(text),
        _ => Ok(Value::Object(Default::default())),
    }
}
