//! Raw Lambda event dispatch.

use crate::error::Result;
use crate::handlers::{GetFlightHandler, IngestHandler, PersistHandler, PersistOutcome, WorkerHandler, WorkerSummary};
use crate::request::{ApiGatewayEvent, EventBridgeEvent, SqsEvent};
use crate::response::ApiResponse;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// A handler invocable with a typed Lambda event.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Inbound event shape.
    type Event: DeserializeOwned + Send;
    /// Value returned to the Lambda runtime.
    type Output: Serialize + Send;

    /// Handler name used in traces.
    fn name(&self) -> &'static str;

    async fn call(&self, event: Self::Event) -> Result<Self::Output>;
}

/// Decode a raw event, run `handler` and encode its output.
pub async fn invoke<H: Handler>(handler: &H, event: Value) -> Result<Value> {
    debug!(handler = handler.name(), "Handling Lambda event");

    let event = serde_json::from_value(event)?;
    let output = handler.call(event).await?;
    Ok(serde_json::to_value(output)?)
}

#[async_trait]
impl Handler for IngestHandler {
    type Event = ApiGatewayEvent;
    type Output = ApiResponse;

    fn name(&self) -> &'static str {
        "ingest"
    }

    async fn call(&self, event: ApiGatewayEvent) -> Result<ApiResponse> {
        Ok(self.handle(event).await)
    }
}

#[async_trait]
impl Handler for GetFlightHandler {
    type Event = ApiGatewayEvent;
    type Output = ApiResponse;

    fn name(&self) -> &'static str {
        "get-flight"
    }

    async fn call(&self, event: ApiGatewayEvent) -> Result<ApiResponse> {
        Ok(self.handle(event).await)
    }
}

#[async_trait]
impl Handler for PersistHandler {
    type Event = EventBridgeEvent;
    type Output = PersistOutcome;

    fn name(&self) -> &'static str {
        "persist"
    }

    async fn call(&self, event: EventBridgeEvent) -> Result<PersistOutcome> {
        self.handle(event).await
    }
}

#[async_trait]
impl Handler for WorkerHandler {
    type Event = SqsEvent;
    type Output = WorkerSummary;

    fn name(&self) -> &'static str {
        "worker"
    }

    async fn call(&self, event: SqsEvent) -> Result<WorkerSummary> {
        self.handle(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use flightbus_log::{LogConfig, MemorySink};
    use crate::handlers::Logging;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_invoke_worker_with_raw_event() {
        let handler = WorkerHandler::new()
            .with_logging(Logging::new(Arc::new(MemorySink::new()), LogConfig::default()));

        let output = invoke(&handler, json!({ "Records": [{ "body": "{}" }, { "body": "{}" }] }))
            .await
            .unwrap();

        assert_eq!(output, json!({ "processed": 2 }));
    }

    #[tokio::test]
    async fn test_invoke_rejects_wrong_event_shape() {
        let handler = WorkerHandler::new();

        let err = invoke(&handler, json!({ "Records": "nope" })).await.unwrap_err();

        assert!(matches!(err, HandlerError::Json(_)));
    }
}
