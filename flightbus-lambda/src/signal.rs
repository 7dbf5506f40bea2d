//! Message type carried by every handler's dispatcher.

use flightbus_log::{LogRecord, LogSignal};
use flightbus_validation::{Outcome, ValidationSignal};
use serde_json::Value;

/// Item ready to be written to a table.
#[derive(Debug, Clone, PartialEq)]
pub struct PutRequest {
    pub table: String,
    pub item: Value,
}

/// Dispatcher message.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Validation request payload or worker message
    Payload(Value),
    /// Validation outcome
    Outcome(Outcome),
    /// Log record
    Log(LogRecord),
    /// Prepared table write
    Put(PutRequest),
}

impl ValidationSignal for Signal {
    fn from_payload(payload: Value) -> Self {
        Signal::Payload(payload)
    }

    fn payload(&self) -> Option<&Value> {
        match self {
            Signal::Payload(payload) => Some(payload),
            _ => None,
        }
    }

    fn from_outcome(outcome: Outcome) -> Self {
        Signal::Outcome(outcome)
    }

    fn as_outcome(&self) -> Option<&Outcome> {
        match self {
            Signal::Outcome(outcome) => Some(outcome),
            _ => None,
        }
    }
}

impl LogSignal for Signal {
    fn from_record(record: LogRecord) -> Self {
        Signal::Log(record)
    }

    fn as_record(&self) -> Option<&LogRecord> {
        match self {
            Signal::Log(record) => Some(record),
            _ => None,
        }
    }
}
