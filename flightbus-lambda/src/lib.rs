//! # flightbus Lambda
//!
//! Flight event handlers for AWS Lambda.
//!
//! Each handler builds a fresh event dispatcher per invocation, attaches the
//! JSON logger and the validators it needs, and talks to the outside world
//! only through the [`RecordStore`] and [`EventPublisher`] traits.
//!
//! | Handler | Trigger | Event |
//! |---------|---------|-------|
//! | [`IngestHandler`] | `POST /events` | [`ApiGatewayEvent`] |
//! | [`GetFlightHandler`] | `GET /flights`, `GET /flights/{id}` | [`ApiGatewayEvent`] |
//! | [`PersistHandler`] | EventBridge rule | [`EventBridgeEvent`] |
//! | [`WorkerHandler`] | SQS queue | [`SqsEvent`] |
//!
//! ## Quick Start
//!
//! ```rust
//! use flightbus_lambda::{ApiGatewayEvent, HandlerConfig, IngestHandler, MemoryPublisher};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let publisher = MemoryPublisher::new();
//! let config = HandlerConfig::builder().event_bus_name("flights-bus").build();
//! let ingest = IngestHandler::new(config, Arc::new(publisher.clone()));
//!
//! let response = ingest
//!     .handle(ApiGatewayEvent::with_body(r#"{"type":"CREATE","data":{"flightId":"XY999"}}"#))
//!     .await;
//!
//! assert_eq!(response.status_code, 202);
//! assert_eq!(publisher.entries()[0].detail_type, "CREATE");
//! # });
//! ```
//!
//! ## Raw Events
//!
//! [`invoke`] decodes a raw Lambda payload into the handler's event type and
//! encodes the result, which is what a runtime loop hands back to AWS.
//!
//! ```rust
//! use flightbus_lambda::{invoke, WorkerHandler};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let output = invoke(&WorkerHandler::new(), json!({ "Records": [] })).await.unwrap();
//! assert_eq!(output, json!({ "processed": 0 }));
//! # });
//! ```

mod config;
mod error;
mod handlers;
mod publisher;
mod request;
mod response;
mod runtime;
mod signal;
mod store;

pub use config::{EVENT_BUS_NAME_VAR, HandlerConfig, HandlerConfigBuilder, TABLE_NAME_VAR};
pub use error::{CollaboratorError, HandlerError, Result};
pub use handlers::{
    GetFlightHandler, HANDLE_EVENT, IngestHandler, Logging, PREPARED_PUT, PersistHandler,
    PersistOutcome, RecordProcessor, WorkerHandler, WorkerSummary,
};
pub use publisher::{EventPublisher, MemoryPublisher, PublishEntry};
pub use request::{ApiGatewayEvent, EventBridgeEvent, SqsEvent, SqsRecord};
pub use response::ApiResponse;
pub use runtime::{Handler, invoke};
pub use signal::{PutRequest, Signal};
pub use store::{MemoryStore, RecordStore, ScanOutput, StoreOp};

/// Initialize tracing for Lambda/CloudWatch.
///
/// This sets up structured JSON logging suitable for CloudWatch Logs.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init();
}

/// Initialize tracing with a custom log level.
pub fn init_tracing_with_level(level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::new(level);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init();
}
