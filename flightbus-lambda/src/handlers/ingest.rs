//! `POST /events`: validate a flight event and publish it.

use super::Logging;
use crate::config::HandlerConfig;
use crate::error::{HandlerError, Result};
use crate::publisher::{EventPublisher, PublishEntry};
use crate::request::ApiGatewayEvent;
use crate::response::ApiResponse;
use crate::signal::Signal;
use chrono::Utc;
use flightbus_events::EventDispatcher;
use flightbus_validation::{Clean, Correlator, FlightEvent, INGEST, attach_validators};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Ingest handler.
#[derive(Clone)]
pub struct IngestHandler {
    config: HandlerConfig,
    publisher: Arc<dyn EventPublisher>,
    logging: Logging,
}

impl IngestHandler {
    pub fn new(config: HandlerConfig, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            config,
            publisher,
            logging: Logging::default(),
        }
    }

    /// Set where log lines go.
    pub fn with_logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Handle one request.
    ///
    /// - 202 `Event accepted` once the event is published
    /// - 400 `Invalid payload` with the rule failures; nothing is published
    /// - 500 `Server error` on malformed JSON or publisher failure
    pub async fn handle(&self, event: ApiGatewayEvent) -> ApiResponse {
        let dispatcher = EventDispatcher::<Signal>::new();
        let result = self.process(&dispatcher, event).await;
        dispatcher.clear();

        match result {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Ingest failed");
                ApiResponse::server_error("Server error", e)
            }
        }
    }

    async fn process(
        &self,
        dispatcher: &EventDispatcher<Signal>,
        event: ApiGatewayEvent,
    ) -> Result<ApiResponse> {
        let log = self.logging.attach(dispatcher);
        attach_validators(dispatcher);

        let body = event.json_body()?;

        let publisher = Arc::clone(&self.publisher);
        let bus_name = self.config.event_bus_name.clone();

        Correlator::new(dispatcher, INGEST)
            .request(
                body,
                move |clean| {
                    let publisher = Arc::clone(&publisher);
                    let bus_name = bus_name.clone();
                    let log = log.clone();

                    async move {
                        let event = ingest_record(clean)?;

                        publisher
                            .publish(PublishEntry {
                                event_bus_name: bus_name,
                                source: event.source.clone(),
                                detail_type: event.event_type.clone(),
                                time: Utc::now(),
                                detail: serde_json::to_string(&event.data)?,
                            })
                            .await?;

                        log.info(
                            "event.published",
                            json!({ "type": event.event_type, "flightId": event.data.flight_id }),
                        );
                        Ok(ApiResponse::message(202, "Event accepted"))
                    }
                },
                |errors| Ok(ApiResponse::rejected(400, "Invalid payload", &errors)),
            )
            .await?
    }
}

fn ingest_record(clean: Clean) -> Result<FlightEvent> {
    match clean {
        Clean::Ingest(event) => Ok(event),
        other => {
            error!(record = ?other, "Ingest validator produced a foreign record");
            Err(HandlerError::UnexpectedRecord {
                handler: "ingest",
                expected: INGEST,
            })
        }
    }
}

impl std::fmt::Debug for IngestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestHandler")
            .field("config", &self.config)
            .field("logging", &self.logging)
            .finish_non_exhaustive()
    }
}
