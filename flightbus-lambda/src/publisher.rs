//! Event publishing.

use crate::error::CollaboratorError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One event submitted to a bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishEntry {
    pub event_bus_name: String,
    pub source: String,
    pub detail_type: String,
    pub time: DateTime<Utc>,
    /// Serialized JSON detail.
    pub detail: String,
}

/// Event bus client used by the ingest handler.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, entry: PublishEntry) -> Result<(), CollaboratorError>;
}

/// In-memory [`EventPublisher`] that records entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    entries: Arc<Mutex<Vec<PublishEntry>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries published so far.
    pub fn entries(&self) -> Vec<PublishEntry> {
        self.entries.lock().clone()
    }

    /// Make every later publish fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, entry: PublishEntry) -> Result<(), CollaboratorError> {
        if let Some(message) = self.failure.lock().clone() {
            return Err(CollaboratorError::Publish(message));
        }

        debug!(bus = %entry.event_bus_name, detail_type = %entry.detail_type, "Publishing event");
        self.entries.lock().push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> PublishEntry {
        PublishEntry {
            event_bus_name: "flights-bus".to_string(),
            source: "app.flights".to_string(),
            detail_type: "FLIGHT_UPDATED".to_string(),
            time: Utc::now(),
            detail: "{\"flightId\":\"A1\"}".to_string(),
        }
    }

    #[tokio::test]
    async fn test_records_entries() {
        let publisher = MemoryPublisher::new();
        publisher.publish(entry()).await.unwrap();

        let entries = publisher.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].detail_type, "FLIGHT_UPDATED");
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let publisher = MemoryPublisher::new();
        publisher.fail_with("ThrottlingException");

        let err = publisher.publish(entry()).await.unwrap_err();
        assert_eq!(err.to_string(), "ThrottlingException");
        assert!(publisher.entries().is_empty());
    }

    #[test]
    fn test_entry_field_names() {
        let value = serde_json::to_value(entry()).unwrap();
        assert!(value.get("EventBusName").is_some());
        assert!(value.get("DetailType").is_some());
    }
}
