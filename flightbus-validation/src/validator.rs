// Domain validators and their dispatcher wiring

use crate::coerce::{is_truthy, lookup, to_string_loose};
use crate::outcome::{Clean, FlightData, FlightEvent, FlightKey, Outcome, validate_event};
use crate::rules::{Rule, ValidationRules};
use flightbus_events::EventDispatcher;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Domain for flight event ingestion.
pub const INGEST: &str = "ingest";

/// Domain for single flight lookups.
pub const GET: &str = "get";

/// Source used when an ingest payload carries none.
pub const DEFAULT_SOURCE: &str = "app.flights";

type NormalizeFn = Arc<dyn Fn(&Value) -> Clean + Send + Sync>;

/// Messages that can carry validation requests and outcomes.
///
/// Implemented by the application's dispatcher message type.
pub trait ValidationSignal: Clone + Send + Sync + 'static {
    fn from_payload(payload: Value) -> Self;

    fn payload(&self) -> Option<&Value>;

    fn from_outcome(outcome: Outcome) -> Self;

    fn as_outcome(&self) -> Option<&Outcome>;
}

/// Rules plus normalizer for one domain.
#[derive(Clone)]
pub struct DomainValidator {
    domain: String,
    rules: ValidationRules,
    normalize: NormalizeFn,
}

impl DomainValidator {
    pub fn new<F>(domain: impl Into<String>, rules: ValidationRules, normalize: F) -> Self
    where
        F: Fn(&Value) -> Clean + Send + Sync + 'static,
    {
        Self {
            domain: domain.into(),
            rules,
            normalize: Arc::new(normalize),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Check a payload and produce its single outcome.
    ///
    /// The normalizer only runs when every rule passed.
    pub fn validate(&self, payload: &Value) -> Outcome {
        match self.rules.validate(payload) {
            Ok(()) => Outcome::Validated {
                domain: self.domain.clone(),
                clean: (self.normalize)(payload),
            },
            Err(errors) => Outcome::Invalid {
                domain: self.domain.clone(),
                errors: errors.messages(),
            },
        }
    }
}

impl std::fmt::Debug for DomainValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainValidator")
            .field("domain", &self.domain)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

/// Validator for `POST /events` bodies.
pub fn ingest_validator() -> DomainValidator {
    let rules = ValidationRules::new()
        .add(Rule::object("body"))
        .add(Rule::required("type"))
        .add(Rule::required("data.flightId"));

    DomainValidator::new(INGEST, rules, normalize_ingest)
}

fn normalize_ingest(payload: &Value) -> Clean {
    let field = |path: &str| lookup(payload, path).cloned().unwrap_or(Value::Null);

    let source = match payload.get("source") {
        Some(source) if is_truthy(Some(source)) => to_string_loose(source),
        _ => DEFAULT_SOURCE.to_string(),
    };

    Clean::Ingest(FlightEvent {
        event_type: to_string_loose(&field("type")),
        source,
        data: FlightData {
            flight_id: to_string_loose(&field("data.flightId")),
            destination: field("data.destination"),
            status: field("data.status"),
            gate: field("data.gate"),
        },
    })
}

/// Validator for `GET /flights/{id}` parameters.
pub fn get_validator() -> DomainValidator {
    let rules = ValidationRules::new().add(Rule::required("flightId"));

    DomainValidator::new(GET, rules, |params| {
        Clean::Get(FlightKey {
            flight_id: lookup(params, "flightId")
                .map(to_string_loose)
                .unwrap_or_default(),
        })
    })
}

/// Set of domain validators attachable to a dispatcher.
#[derive(Debug, Clone, Default)]
pub struct Validators {
    domains: Vec<DomainValidator>,
}

impl Validators {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in `ingest` and `get` domains
    pub fn standard() -> Self {
        Self::new().with(ingest_validator()).with(get_validator())
    }

    /// Add a domain
    pub fn with(mut self, validator: DomainValidator) -> Self {
        self.domains.push(validator);
        self
    }

    /// Validate without a dispatcher
    pub fn validate(&self, domain: &str, payload: &Value) -> Option<Outcome> {
        self.domains
            .iter()
            .find(|v| v.domain() == domain)
            .map(|v| v.validate(payload))
    }

    /// Subscribe one `validate:<domain>` listener per domain.
    ///
    /// Each listener emits exactly one outcome on the dispatcher that delivered
    /// the request. A message without a payload is validated as `null`.
    pub fn attach<M, R>(&self, dispatcher: &EventDispatcher<M, R>)
    where
        M: ValidationSignal,
        R: Default + Send + 'static,
    {
        for validator in &self.domains {
            let validator = validator.clone();

            dispatcher.subscribe(
                validate_event(validator.domain()),
                move |bus: &EventDispatcher<M, R>, message: &M| {
                    let outcome = validator.validate(message.payload().unwrap_or(&Value::Null));
                    debug!(
                        domain = validator.domain(),
                        outcome = outcome.event_name(),
                        "Validated payload"
                    );

                    bus.emit(outcome.event_name(), &M::from_outcome(outcome))?;
                    Ok(R::default())
                },
            );
        }
    }
}

/// Attach the standard validators to a dispatcher.
pub fn attach_validators<M, R>(dispatcher: &EventDispatcher<M, R>)
where
    M: ValidationSignal,
    R: Default + Send + 'static,
{
    Validators::standard().attach(dispatcher);
}
