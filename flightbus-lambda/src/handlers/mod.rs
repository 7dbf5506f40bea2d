//! Lambda handlers.
//!
//! Every invocation builds its own [`EventDispatcher`], attaches the logger
//! and whatever validators it needs, and drops the dispatcher on return.

mod get_flight;
mod ingest;
mod persist;
mod worker;

pub use get_flight::GetFlightHandler;
pub use ingest::IngestHandler;
pub use persist::{PREPARED_PUT, PersistHandler, PersistOutcome};
pub use worker::{HANDLE_EVENT, RecordProcessor, WorkerHandler, WorkerSummary};

use crate::signal::Signal;
use flightbus_events::EventDispatcher;
use flightbus_log::{LogConfig, LogSink, Logger, StdoutSink, attach_logger_with};
use std::sync::Arc;

/// Where handler log lines go.
#[derive(Clone)]
pub struct Logging {
    sink: Arc<dyn LogSink>,
    config: LogConfig,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            sink: Arc::new(StdoutSink),
            config: flightbus_log::config().clone(),
        }
    }
}

impl Logging {
    pub fn new(sink: Arc<dyn LogSink>, config: LogConfig) -> Self {
        Self { sink, config }
    }

    /// Attach the sink to an invocation's dispatcher.
    pub fn attach(&self, dispatcher: &EventDispatcher<Signal>) -> Logger<Signal> {
        attach_logger_with(dispatcher, Arc::clone(&self.sink), self.config.clone())
    }
}

impl std::fmt::Debug for Logging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logging")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
