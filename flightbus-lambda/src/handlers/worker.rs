//! Queue worker: fans each message out to its processors.

use super::Logging;
use crate::error::{CollaboratorError, Result};
use crate::request::SqsEvent;
use crate::signal::Signal;
use async_trait::async_trait;
use flightbus_events::{BoxError, EventDispatcher};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

/// Event each queue message is emitted under.
pub const HANDLE_EVENT: &str = "handle";

/// Additional work run for every queue message.
#[async_trait]
pub trait RecordProcessor: Send + Sync {
    async fn process(&self, message: Value) -> std::result::Result<(), CollaboratorError>;
}

/// Batch summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub processed: usize,
}

/// Worker handler.
#[derive(Clone, Default)]
pub struct WorkerHandler {
    processors: Vec<Arc<dyn RecordProcessor>>,
    logging: Logging,
}

impl WorkerHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set where log lines go.
    pub fn with_logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Run `processor` for every message, after the built-in logging step.
    pub fn with_processor(mut self, processor: Arc<dyn RecordProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Process records in order.
    ///
    /// Each message waits for every processor before the next one starts. A
    /// malformed body or a failing processor aborts the batch.
    pub async fn handle(&self, event: SqsEvent) -> Result<WorkerSummary> {
        let dispatcher = EventDispatcher::<Signal>::new();
        let result = self.process(&dispatcher, event).await;
        dispatcher.clear();
        result
    }

    async fn process(&self, dispatcher: &EventDispatcher<Signal>, event: SqsEvent) -> Result<WorkerSummary> {
        let log = self.logging.attach(dispatcher);

        dispatcher.subscribe_async(HANDLE_EVENT, move |_, message: Signal| {
            let log = log.clone();
            async move {
                if let Signal::Payload(msg) = message {
                    log.info("worker.process", json!({ "msg": msg }));
                }
                Ok(())
            }
        });

        for processor in &self.processors {
            let processor = Arc::clone(processor);
            dispatcher.subscribe_async(HANDLE_EVENT, move |_, message: Signal| {
                let processor = Arc::clone(&processor);
                async move {
                    match message {
                        Signal::Payload(msg) => processor
                            .process(msg)
                            .await
                            .map_err(|e| Box::new(e) as BoxError),
                        _ => Ok(()),
                    }
                }
            });
        }

        for record in &event.records {
            let message = record.json_body()?;
            debug!(message_id = ?record.message_id, "Processing record");

            dispatcher
                .emit_async(HANDLE_EVENT, Signal::Payload(message))
                .await?;
        }

        Ok(WorkerSummary {
            processed: event.records.len(),
        })
    }
}

impl std::fmt::Debug for WorkerHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandler")
            .field("processors", &self.processors.len())
            .field("logging", &self.logging)
            .finish()
    }
}
