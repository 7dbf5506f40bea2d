//! Flight record storage.

use crate::error::CollaboratorError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Items and count returned by a full table scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanOutput {
    pub items: Vec<Value>,
    pub count: usize,
}

/// Key-value table access used by the handlers.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Get the item whose attributes exactly match every attribute of `key`.
    async fn get(&self, table: &str, key: &Value) -> Result<Option<Value>, CollaboratorError>;

    /// Read every item in `table`.
    async fn scan(&self, table: &str) -> Result<ScanOutput, CollaboratorError>;

    /// Write `item`, replacing any item with the same primary key.
    async fn put(&self, table: &str, item: Value) -> Result<(), CollaboratorError>;
}

/// Store operation, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Scan,
    Put,
}

/// In-memory [`RecordStore`] for tests and local runs.
///
/// Items are keyed by a single primary key attribute, `flightId` by default.
#[derive(Debug)]
pub struct MemoryStore {
    key_attribute: String,
    tables: DashMap<String, Vec<Value>>,
    failures: DashMap<StoreOp, String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store keyed by `flightId`.
    pub fn new() -> Self {
        Self::with_key_attribute("flightId")
    }

    /// Create an empty store keyed by `attribute`.
    pub fn with_key_attribute(attribute: impl Into<String>) -> Self {
        Self {
            key_attribute: attribute.into(),
            tables: DashMap::new(),
            failures: DashMap::new(),
        }
    }

    /// Seed an item without going through the failure checks.
    pub fn insert(&self, table: &str, item: Value) {
        let mut items = self.tables.entry(table.to_string()).or_default();
        let key = item.get(&self.key_attribute).cloned();

        match items
            .iter_mut()
            .find(|existing| key.is_some() && existing.get(&self.key_attribute) == key.as_ref())
        {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    /// Make every later `op` fail with `message`.
    pub fn fail_on(&self, op: StoreOp, message: impl Into<String>) {
        self.failures.insert(op, message.into());
    }

    /// Stop injecting failures for `op`.
    pub fn clear_failure(&self, op: StoreOp) {
        self.failures.remove(&op);
    }

    /// Snapshot of a table's items.
    pub fn items(&self, table: &str) -> Vec<Value> {
        self.tables
            .get(table)
            .map(|items| items.value().clone())
            .unwrap_or_default()
    }

    fn check(&self, op: StoreOp) -> Result<(), CollaboratorError> {
        match self.failures.get(&op) {
            Some(message) => Err(CollaboratorError::Store(message.clone())),
            None => Ok(()),
        }
    }
}

fn matches_key(item: &Value, key: &Value) -> bool {
    match key.as_object() {
        Some(key) => key.iter().all(|(name, value)| item.get(name) == Some(value)),
        None => false,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, table: &str, key: &Value) -> Result<Option<Value>, CollaboratorError> {
        self.check(StoreOp::Get)?;

        let found = self
            .tables
            .get(table)
            .and_then(|items| items.iter().find(|item| matches_key(item, key)).cloned());

        debug!(table, found = found.is_some(), "Store get");
        Ok(found)
    }

    async fn scan(&self, table: &str) -> Result<ScanOutput, CollaboratorError> {
        self.check(StoreOp::Scan)?;

        let items = self.items(table);
        Ok(ScanOutput {
            count: items.len(),
            items,
        })
    }

    async fn put(&self, table: &str, item: Value) -> Result<(), CollaboratorError> {
        self.check(StoreOp::Put)?;

        if item.get(&self.key_attribute).is_none() {
            return Err(CollaboratorError::Store(format!(
                "One or more parameter values were invalid: Missing the key {} in the item",
                self.key_attribute
            )));
        }

        self.insert(table, item);
        Ok(())
    }
}
