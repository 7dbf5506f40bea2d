//! Event-driven validation for flightbus handlers
//!
//! Validators listen on an [`EventDispatcher`](flightbus_events::EventDispatcher)
//! for `validate:<domain>` requests and answer each one with exactly one
//! outcome: `validated` with a normalized record, or `invalid` with the
//! ordered list of rule failures.
//!
//! # Examples
//!
//! ## Validating Directly
//!
//! ```
//! use flightbus_validation::{ingest_validator, Outcome};
//! use serde_json::json;
//!
//! let outcome = ingest_validator().validate(&json!({ "data": {} }));
//! assert_eq!(
//!     outcome.errors().unwrap(),
//!     ["type required", "data.flightId required"]
//! );
//! ```
//!
//! ## Validation Rules Builder
//!
//! ```
//! use flightbus_validation::{Rule, ValidationRules};
//! use serde_json::json;
//!
//! let rules = ValidationRules::new()
//!     .add(Rule::object("body"))
//!     .add(Rule::required("data.flightId"));
//!
//! assert!(rules.validate(&json!({ "data": { "flightId": "AB123" } })).is_ok());
//! assert!(rules.validate(&json!({ "data": { "flightId": "" } })).is_err());
//! ```
//!
//! ## Correlating a Request
//!
//! The message type implements [`ValidationSignal`] so validators can read
//! payloads from it and emit outcomes through it.
//!
//! ```
//! use flightbus_events::EventDispatcher;
//! use flightbus_validation::*;
//! use serde_json::{json, Value};
//!
//! #[derive(Clone)]
//! enum Msg {
//!     Payload(Value),
//!     Outcome(Outcome),
//! }
//!
//! impl ValidationSignal for Msg {
//!     fn from_payload(payload: Value) -> Self { Msg::Payload(payload) }
//!     fn payload(&self) -> Option<&Value> {
//!         if let Msg::Payload(p) = self { Some(p) } else { None }
//!     }
//!     fn from_outcome(outcome: Outcome) -> Self { Msg::Outcome(outcome) }
//!     fn as_outcome(&self) -> Option<&Outcome> {
//!         if let Msg::Outcome(o) = self { Some(o) } else { None }
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let dispatcher: EventDispatcher<Msg> = EventDispatcher::new();
//! attach_validators(&dispatcher);
//!
//! let correlator = Correlator::new(&dispatcher, GET);
//! let id = correlator
//!     .request(
//!         json!({ "flightId": 7 }),
//!         |clean| async move { clean.as_get().map(|k| k.flight_id.clone()) },
//!         |_| None,
//!     )
//!     .await
//!     .unwrap();
//! assert_eq!(id.as_deref(), Some("7"));
//! # });
//! ```

mod coerce;
mod correlator;
mod errors;
mod outcome;
mod rules;
mod validator;

pub use coerce::*;
pub use correlator::*;
pub use errors::*;
pub use outcome::*;
pub use rules::*;
pub use validator::*;
