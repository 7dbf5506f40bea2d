//! API Gateway proxy responses.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// API Gateway proxy response with a JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    /// Status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Serialized JSON body.
    pub body: String,
}

impl ApiResponse {
    /// Create a JSON response.
    pub fn json<T: Serialize>(status_code: u16, body: &T) -> Self {
        Self {
            status_code,
            headers: BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string()),
        }
    }

    /// Create a `{ "message": ... }` response.
    pub fn message(status_code: u16, message: &str) -> Self {
        Self::json(status_code, &json!({ "message": message }))
    }

    /// Create a `{ "message": ..., "errors": [...] }` response.
    pub fn rejected(status_code: u16, message: &str, errors: &[String]) -> Self {
        Self::json(status_code, &json!({ "message": message, "errors": errors }))
    }

    /// Create a 500 `{ "message": ..., "error": ... }` response.
    pub fn server_error(message: &str, error: impl std::fmt::Display) -> Self {
        Self::json(
            500,
            &json!({ "message": message, "error": error.to_string() }),
        )
    }

    /// Parse the body back into JSON.
    pub fn body_json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shape() {
        let response = ApiResponse::message(202, "Event accepted");

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "statusCode": 202,
                "headers": { "Content-Type": "application/json" },
                "body": "{\"message\":\"Event accepted\"}"
            })
        );
    }

    #[test]
    fn test_rejected_body() {
        let response = ApiResponse::rejected(400, "Bad Request", &["flightId required".to_string()]);
        assert_eq!(
            response.body_json().unwrap(),
            json!({ "message": "Bad Request", "errors": ["flightId required"] })
        );
    }

    #[test]
    fn test_server_error_body() {
        let response = ApiResponse::server_error("Server error", "boom");
        assert_eq!(response.status_code, 500);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(
            response.body_json().unwrap(),
            json!({ "message": "Server error", "error": "boom" })
        );
    }
}
