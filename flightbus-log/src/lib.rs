//! Flightbus Logging
//!
//! Structured one-line JSON logging driven by the `log` event of an
//! [`EventDispatcher`].
//!
//! # Features
//!
//! - **Event driven**: log calls are `log` emissions; the sink is an ordinary
//!   subscriber, so logging never touches validation control flow
//! - **One line per call**: `{"level":"info","msg":"...", ...context}`
//! - **Environment-controlled**: minimum level and timestamps come from the
//!   environment
//!
//! # Usage
//!
//! ```rust
//! use flightbus_events::EventDispatcher;
//! use flightbus_log::{LogConfig, LogRecord, LogSignal, MemorySink, attach_logger_with};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone)]
//! struct Msg(LogRecord);
//!
//! impl LogSignal for Msg {
//!     fn from_record(record: LogRecord) -> Self { Msg(record) }
//!     fn as_record(&self) -> Option<&LogRecord> { Some(&self.0) }
//! }
//!
//! let dispatcher: EventDispatcher<Msg> = EventDispatcher::new();
//! let sink = MemorySink::new();
//! let log = attach_logger_with(&dispatcher, Arc::new(sink.clone()), LogConfig::default());
//!
//! log.info("Server started", json!({ "port": 8080 }));
//! assert_eq!(sink.lines(), vec![r#"{"level":"info","msg":"Server started","port":8080}"#]);
//! ```
//!
//! # Environment Variables
//!
//! - `FLIGHTBUS_LOG_LEVEL=trace|debug|info|warn|error|off` - Set minimum level
//! - `FLIGHTBUS_LOG_TIMESTAMPS=1|0` - Prefix each line with an RFC 3339 timestamp

use flightbus_events::EventDispatcher;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Event name the logger sink subscribes to.
pub const LOG_EVENT: &str = "log";

// ============================================================================
// Log Levels
// ============================================================================

/// Log level for flightbus logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Get level from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Get level name as written to the log line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Global configuration (lazy initialized).
static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level written by the sink
    pub level: Level,
    /// Whether to include timestamps
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            timestamps: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = lookup("FLIGHTBUS_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(Level::Info);

        let timestamps = lookup("FLIGHTBUS_LOG_TIMESTAMPS")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        Self { level, timestamps }
    }

    /// Whether a record at `level` passes the filter.
    pub fn enabled(&self, level: Level) -> bool {
        level != Level::Off && level >= self.level
    }
}

/// Get the global configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Records
// ============================================================================

/// Payload of a `log` emission.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub context: Map<String, Value>,
}

impl LogRecord {
    /// Build a record; an object context is merged into the line, any other
    /// non-null value is kept under `context`.
    pub fn new(level: Level, message: impl Into<String>, context: Option<Value>) -> Self {
        let context = match context {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => Map::new(),
            Some(other) => {
                let mut map = Map::new();
                map.insert("context".to_string(), other);
                map
            }
        };

        Self {
            level,
            message: message.into(),
            context,
        }
    }

    /// Render the record as one JSON line.
    ///
    /// `level` and `msg` come first; context keys follow and overwrite them on
    /// collision.
    pub fn to_line(&self, timestamps: bool) -> String {
        let mut line = Map::new();

        if timestamps {
            line.insert(
                "timestamp".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        line.insert("level".to_string(), Value::from(self.level.as_str()));
        line.insert("msg".to_string(), Value::from(self.message.as_str()));

        for (key, value) in &self.context {
            line.insert(key.clone(), value.clone());
        }

        Value::Object(line).to_string()
    }
}

/// Messages that can carry a [`LogRecord`].
///
/// Implemented by the application's dispatcher message type.
pub trait LogSignal: Clone + Send + Sync + 'static {
    fn from_record(record: LogRecord) -> Self;

    fn as_record(&self) -> Option<&LogRecord>;
}

// ============================================================================
// Sinks
// ============================================================================

/// Destination for formatted log lines.
pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &str) -> std::io::Result<()>;
}

/// Writes each line to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)
    }
}

/// Keeps lines in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Lines parsed back into JSON values.
    pub fn records(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Logger
// ============================================================================

/// Helpers that emit `log` events on one dispatcher.
pub struct Logger<M, R = ()> {
    dispatcher: EventDispatcher<M, R>,
}

impl<M, R> Clone for Logger<M, R> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<M, R> Logger<M, R>
where
    M: LogSignal,
    R: Send + 'static,
{
    /// Emit a record at `level`. Dispatch failures are swallowed.
    pub fn log(&self, level: Level, msg: &str, ctx: impl Into<Option<Value>>) {
        let record = LogRecord::new(level, msg, ctx.into());

        if let Err(e) = self.dispatcher.emit(LOG_EVENT, &M::from_record(record)) {
            tracing::warn!(error = %e, "Log emission failed");
        }
    }

    pub fn info(&self, msg: &str, ctx: impl Into<Option<Value>>) {
        self.log(Level::Info, msg, ctx);
    }

    pub fn warn(&self, msg: &str, ctx: impl Into<Option<Value>>) {
        self.log(Level::Warn, msg, ctx);
    }

    pub fn error(&self, msg: &str, ctx: impl Into<Option<Value>>) {
        self.log(Level::Error, msg, ctx);
    }
}

/// Attach a stdout sink using the global configuration.
pub fn attach_logger<M, R>(dispatcher: &EventDispatcher<M, R>) -> Logger<M, R>
where
    M: LogSignal,
    R: Default + Send + 'static,
{
    attach_logger_with(dispatcher, Arc::new(StdoutSink), config().clone())
}

/// Attach `sink` to the dispatcher's `log` event and return the helpers.
pub fn attach_logger_with<M, R>(
    dispatcher: &EventDispatcher<M, R>,
    sink: Arc<dyn LogSink>,
    config: LogConfig,
) -> Logger<M, R>
where
    M: LogSignal,
    R: Default + Send + 'static,
{
    dispatcher.subscribe(LOG_EVENT, move |_, message: &M| {
        if let Some(record) = message.as_record() {
            if config.enabled(record.level) {
                let _ = sink.write_line(&record.to_line(config.timestamps));
            }
        }
        Ok(R::default())
    });

    Logger {
        dispatcher: dispatcher.clone(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone)]
    enum TestMsg {
        Log(LogRecord),
        Other,
    }

    impl LogSignal for TestMsg {
        fn from_record(record: LogRecord) -> Self {
            TestMsg::Log(record)
        }

        fn as_record(&self) -> Option<&LogRecord> {
            match self {
                TestMsg::Log(record) => Some(record),
                TestMsg::Other => None,
            }
        }
    }

    fn setup(config: LogConfig) -> (Logger<TestMsg>, MemorySink) {
        let dispatcher = EventDispatcher::new();
        let sink = MemorySink::new();
        let logger = attach_logger_with(&dispatcher, Arc::new(sink.clone()), config);
        (logger, sink)
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("debug"), Some(Level::Debug));
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("invalid"), None);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = LogConfig::from_lookup(|key| match key {
            "FLIGHTBUS_LOG_LEVEL" => Some("warn".to_string()),
            "FLIGHTBUS_LOG_TIMESTAMPS" => Some("true".to_string()),
            _ => None,
        });

        assert_eq!(config.level, Level::Warn);
        assert!(config.timestamps);
        assert!(!config.enabled(Level::Info));
        assert!(config.enabled(Level::Error));

        let config = LogConfig::from_lookup(|_| None);
        assert_eq!(config.level, Level::Info);
        assert!(!config.timestamps);
    }

    #[test]
    fn test_info_prints_one_line_with_context() {
        let (log, sink) = setup(LogConfig::default());

        log.info("Server started", json!({ "port": 8080, "env": "test" }));

        assert_eq!(sink.lines().len(), 1);
        assert_eq!(
            sink.records()[0],
            json!({ "level": "info", "msg": "Server started", "port": 8080, "env": "test" })
        );
    }

    #[test]
    fn test_warn_and_error_levels() {
        let (log, sink) = setup(LogConfig::default());

        log.warn("Low disk", json!({ "freeGB": 1.2 }));
        log.error("Crash", json!({ "code": "EFAIL" }));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["level"], "warn");
        assert_eq!(records[0]["freeGB"], 1.2);
        assert_eq!(records[1]["level"], "error");
        assert_eq!(records[1]["code"], "EFAIL");
    }

    #[test]
    fn test_missing_context_writes_level_and_msg_only() {
        let (log, sink) = setup(LogConfig::default());

        log.info("No context", None);

        assert_eq!(sink.lines(), vec![r#"{"level":"info","msg":"No context"}"#]);
    }

    #[test]
    fn test_context_is_not_mutated() {
        let (log, _sink) = setup(LogConfig::default());
        let ctx = json!({ "requestId": "abc", "retries": 0 });

        log.info("Processing", ctx.clone());

        assert_eq!(ctx, json!({ "requestId": "abc", "retries": 0 }));
    }

    #[test]
    fn test_context_overrides_level_and_msg() {
        let (log, sink) = setup(LogConfig::default());

        log.info("Hello", json!({ "level": "custom", "msg": "shadowed" }));

        assert_eq!(sink.lines(), vec![r#"{"level":"custom","msg":"shadowed"}"#]);
    }

    #[test]
    fn test_records_below_level_are_dropped() {
        let (log, sink) = setup(LogConfig {
            level: Level::Warn,
            timestamps: false,
        });

        log.info("quiet", None);
        log.error("loud", None);

        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.records()[0]["msg"], "loud");
    }

    #[test]
    fn test_timestamps() {
        let (log, sink) = setup(LogConfig {
            level: Level::Info,
            timestamps: true,
        });

        log.info("stamped", None);

        let line = &sink.lines()[0];
        assert!(line.starts_with(r#"{"timestamp":""#));
        assert!(sink.records()[0]["timestamp"].is_string());
    }

    #[test]
    fn test_non_log_messages_are_ignored() {
        let dispatcher: EventDispatcher<TestMsg> = EventDispatcher::new();
        let sink = MemorySink::new();
        attach_logger_with(&dispatcher, Arc::new(sink.clone()), LogConfig::default());

        dispatcher.emit(LOG_EVENT, &TestMsg::Other).unwrap();
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_scalar_context_is_nested() {
        let record = LogRecord::new(Level::Info, "odd", Some(json!(42)));
        assert_eq!(record.to_line(false), r#"{"level":"info","msg":"odd","context":42}"#);
    }
}
