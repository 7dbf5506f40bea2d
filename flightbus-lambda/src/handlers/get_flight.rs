//! `GET /flights` and `GET /flights/{id}`.

use crate::config::HandlerConfig;
use crate::error::{HandlerError, Result};
use crate::request::ApiGatewayEvent;
use crate::response::ApiResponse;
use crate::signal::Signal;
use crate::store::RecordStore;
use flightbus_events::EventDispatcher;
use flightbus_validation::{Clean, Correlator, FlightKey, GET, attach_validators};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::error;

/// Flight lookup handler.
#[derive(Clone)]
pub struct GetFlightHandler {
    config: HandlerConfig,
    store: Arc<dyn RecordStore>,
}

impl GetFlightHandler {
    pub fn new(config: HandlerConfig, store: Arc<dyn RecordStore>) -> Self {
        Self { config, store }
    }

    /// Handle one request.
    ///
    /// Without path parameters every flight is listed. Otherwise the `id`
    /// parameter is validated and looked up:
    ///
    /// - 400 `Bad Request` with the rule failures
    /// - 404 `Flight not found`
    /// - 200 with the stored record
    /// - 500 `Error retrieving flight` on lookup failure
    pub async fn handle(&self, event: ApiGatewayEvent) -> ApiResponse {
        let Some(params) = event.path_parameters else {
            return self.list().await;
        };

        let flight_id = params.get("id").map_or(Value::Null, |id| json!(id));

        let dispatcher = EventDispatcher::<Signal>::new();
        let result = self.lookup(&dispatcher, flight_id).await;
        dispatcher.clear();

        match result {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Flight lookup failed");
                ApiResponse::server_error("Error retrieving flight", e)
            }
        }
    }

    async fn list(&self) -> ApiResponse {
        match self.store.scan(&self.config.table_name).await {
            Ok(scan) => ApiResponse::json(200, &json!({ "flights": scan.items, "count": scan.count })),
            Err(e) => {
                error!(error = %e, "Flight scan failed");
                ApiResponse::server_error("Error retrieving flights", e)
            }
        }
    }

    async fn lookup(&self, dispatcher: &EventDispatcher<Signal>, flight_id: Value) -> Result<ApiResponse> {
        attach_validators(dispatcher);

        let store = Arc::clone(&self.store);
        let table = self.config.table_name.clone();

        Correlator::new(dispatcher, GET)
            .request(
                json!({ "flightId": flight_id }),
                move |clean| {
                    let store = Arc::clone(&store);
                    let table = table.clone();

                    async move {
                        let key = lookup_key(clean)?;

                        let found = store.get(&table, &json!({ "flightId": key.flight_id })).await?;
                        Ok(match found {
                            Some(item) => ApiResponse::json(200, &item),
                            None => ApiResponse::message(404, "Flight not found"),
                        })
                    }
                },
                |errors| Ok(ApiResponse::rejected(400, "Bad Request", &errors)),
            )
            .await?
    }
}

fn lookup_key(clean: Clean) -> Result<FlightKey> {
    match clean {
        Clean::Get(key) => Ok(key),
        other => {
            error!(record = ?other, "Get validator produced a foreign record");
            Err(HandlerError::UnexpectedRecord {
                handler: "get-flight",
                expected: GET,
            })
        }
    }
}

impl std::fmt::Debug for GetFlightHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetFlightHandler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
