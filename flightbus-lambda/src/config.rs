//! Handler configuration.

use serde::{Deserialize, Serialize};

/// Environment variable naming the flights table.
pub const TABLE_NAME_VAR: &str = "TABLE_NAME";

/// Environment variable naming the EventBridge bus.
pub const EVENT_BUS_NAME_VAR: &str = "EVENT_BUS_NAME";

/// Collaborator names shared by all handlers.
///
/// Missing values stay empty; the collaborator rejects them at call time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Table read and written by the flight store.
    pub table_name: String,
    /// Bus that ingested events are published to.
    pub event_bus_name: String,
}

impl HandlerConfig {
    /// Create a builder.
    pub fn builder() -> HandlerConfigBuilder {
        HandlerConfigBuilder::new()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> HandlerConfigBuilder {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> HandlerConfigBuilder
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = HandlerConfigBuilder::new();

        if let Some(table) = lookup(TABLE_NAME_VAR) {
            builder = builder.table_name(table);
        }
        if let Some(bus) = lookup(EVENT_BUS_NAME_VAR) {
            builder = builder.event_bus_name(bus);
        }

        builder
    }
}

/// Builder for handler configuration.
#[derive(Debug, Default)]
pub struct HandlerConfigBuilder {
    config: HandlerConfig,
}

impl HandlerConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the table name.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.config.table_name = name.into();
        self
    }

    /// Set the event bus name.
    pub fn event_bus_name(mut self, name: impl Into<String>) -> Self {
        self.config.event_bus_name = name.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> HandlerConfig {
        self.config
    }
}
