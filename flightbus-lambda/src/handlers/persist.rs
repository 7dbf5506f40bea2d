//! EventBridge target that writes flight updates to the table.

use super::Logging;
use crate::config::HandlerConfig;
use crate::error::{HandlerError, Result};
use crate::request::EventBridgeEvent;
use crate::signal::{PutRequest, Signal};
use crate::store::RecordStore;
use chrono::{SecondsFormat, Utc};
use flightbus_events::EventDispatcher;
use flightbus_validation::{Settlement, is_truthy, lookup, to_string_loose};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Event carrying an item ready to be written.
pub const PREPARED_PUT: &str = "prepared:put";

/// Result of one persist invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistOutcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PersistOutcome {
    pub fn written() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// Persist handler.
#[derive(Clone)]
pub struct PersistHandler {
    config: HandlerConfig,
    store: Arc<dyn RecordStore>,
    logging: Logging,
}

impl PersistHandler {
    pub fn new(config: HandlerConfig, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config,
            store,
            logging: Logging::default(),
        }
    }

    /// Set where log lines go.
    pub fn with_logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Write the flight in `event.detail`.
    ///
    /// An event without a truthy `detail.flightId` is skipped. Store failures
    /// are returned unmodified after being logged as `ddb.put.err`.
    pub async fn handle(&self, event: EventBridgeEvent) -> Result<PersistOutcome> {
        let dispatcher = EventDispatcher::<Signal>::new();
        let result = self.process(&dispatcher, event).await;
        dispatcher.clear();
        result
    }

    async fn process(
        &self,
        dispatcher: &EventDispatcher<Signal>,
        event: EventBridgeEvent,
    ) -> Result<PersistOutcome> {
        let log = self.logging.attach(dispatcher);
        let (settlement, settled) = Settlement::<Result<PersistOutcome>>::channel();
        let store = Arc::clone(&self.store);

        dispatcher.subscribe_async(PREPARED_PUT, move |_, message: Signal| {
            let store = Arc::clone(&store);
            let settlement = settlement.clone();
            let log = log.clone();

            async move {
                let Signal::Put(request) = message else {
                    return Ok(());
                };
                let PutRequest { table, item } = request;
                let pk = item.get("flightId").cloned().unwrap_or(Value::Null);

                // The settlement outlives this task, so a panic must still settle it.
                let written = AssertUnwindSafe(async { store.put(&table, item).await })
                    .catch_unwind()
                    .await;

                match written {
                    Ok(Ok(())) => {
                        log.info("ddb.put.ok", json!({ "pk": pk }));
                        settlement.settle(Ok(PersistOutcome::written()));
                    }
                    Ok(Err(e)) => {
                        log.error("ddb.put.err", json!({ "error": e.to_string() }));
                        settlement.settle(Err(e.into()));
                    }
                    Err(_) => {
                        let e = HandlerError::Panicked("persist");
                        log.error("ddb.put.err", json!({ "error": e.to_string() }));
                        settlement.settle(Err(e));
                    }
                }
                Ok(())
            }
        });

        let detail = event.detail.unwrap_or_else(|| Value::Object(Map::new()));
        let Some(item) = prepare_item(&detail, event.detail_type) else {
            return Ok(PersistOutcome::skipped("missing flightId"));
        };

        dispatcher.emit(
            PREPARED_PUT,
            &Signal::Put(PutRequest {
                table: self.config.table_name.clone(),
                item,
            }),
        )?;

        settled
            .await
            .unwrap_or(Err(HandlerError::Unsettled("persist")))
    }
}

/// Build the table item, or `None` when `flightId` is missing or falsy.
fn prepare_item(detail: &Value, detail_type: Option<String>) -> Option<Value> {
    let flight_id = lookup(detail, "flightId").filter(|id| is_truthy(Some(*id)))?;
    let field = |name: &str| lookup(detail, name).cloned().unwrap_or(Value::Null);

    let mut item = Map::new();
    item.insert("flightId".to_string(), Value::String(to_string_loose(flight_id)));
    item.insert("destination".to_string(), field("destination"));
    item.insert("status".to_string(), field("status"));
    item.insert("gate".to_string(), field("gate"));
    item.insert(
        "updatedAt".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    if let Some(event_type) = detail_type {
        item.insert("lastEventType".to_string(), Value::String(event_type));
    }

    Some(Value::Object(item))
}

impl std::fmt::Debug for PersistHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistHandler")
            .field("config", &self.config)
            .field("logging", &self.logging)
            .finish_non_exhaustive()
    }
}
