// flightbus - Event-driven flight ingestion for serverless Rust
//
// This library wires a per-invocation event dispatcher to payload validators,
// a request/outcome correlator and a one-line JSON logger.

// Re-export core functionality
pub use flightbus_events::*;
pub use flightbus_validation::*;

pub use flightbus_log;

// Re-export optional crates
#[cfg(feature = "lambda")]
pub use flightbus_lambda;

// Prelude for common imports
/// Common imports.
///
/// ```
/// use flightbus::prelude::*;
///
/// # tokio_test::block_on(async {
/// let dispatcher: EventDispatcher<u32, u32> = EventDispatcher::new();
/// dispatcher.subscribe("double", |_, n: &u32| Ok(n * 2));
/// dispatcher.subscribe_async("triple", |_, n: u32| async move { Ok(n * 3) });
///
/// let doubled = dispatcher.emit_async("double", 5).await.unwrap();
/// let tripled = dispatcher.emit_async("triple", 5).await.unwrap();
/// assert_eq!((doubled, tripled), (vec![10], vec![15]));
/// # });
/// ```
pub mod prelude {
    pub use crate::{
        Clean,
        CorrelationError,
        CorrelationState,
        Correlator,
        DispatchError,
        EventDispatcher,
        Outcome,
        ValidationSignal,
        Validators,
        attach_validators,
    };
    pub use flightbus_log::{LogSignal, Logger, attach_logger};

    #[cfg(feature = "lambda")]
    pub use flightbus_lambda::{
        ApiGatewayEvent, ApiResponse, EventBridgeEvent, EventPublisher, GetFlightHandler,
        HandlerConfig, HandlerError, IngestHandler, PersistHandler, RecordStore, Signal, SqsEvent,
        WorkerHandler,
    };
}
