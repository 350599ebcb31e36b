//! Structured JSON logging.
//!
//! Every subsystem logs through a cloned [`Logger`] wrapping one shared
//! sink. Events carry a `marquee::<subsystem>` target string plus arbitrary
//! JSON fields; the logger filters by level so a production page can run at
//! `Info` while debug builds drop to `Debug`.

use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

pub type LogFields = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One structured log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub ts_ms: u128,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "LogFields::is_empty", default)]
    pub fields: LogFields,
}

impl LogEvent {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_fields(level, target, message, LogFields::new())
    }

    pub fn with_fields(
        level: LogLevel,
        target: impl Into<String>,
        message: impl Into<String>,
        fields: LogFields,
    ) -> Self {
        Self {
            ts_ms: unix_ms(),
            level,
            target: target.into(),
            message: message.into(),
            fields,
        }
    }
}

pub(crate) fn unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

pub type LoggingResult<T> = std::result::Result<T, LoggingError>;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait LogSink: Send + Sync {
    fn log(&self, event: &LogEvent) -> LoggingResult<()>;
}

/// Cheap-to-clone handle carrying the shared sink and a level floor.
/// Events below the floor are dropped before they reach the sink.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    min_level: LogLevel,
}

impl Logger {
    pub fn new<S>(sink: S) -> Self
    where
        S: LogSink + 'static,
    {
        Self {
            sink: Arc::new(sink),
            min_level: LogLevel::Trace,
        }
    }

    pub fn with_min_level(mut self, min_level: LogLevel) -> Self {
        self.min_level = min_level;
        self
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn log(&self, level: LogLevel, target: &str, message: &str) -> LoggingResult<()> {
        self.log_event(LogEvent::new(level, target, message))
    }

    pub fn log_with_fields(
        &self,
        level: LogLevel,
        target: &str,
        message: &str,
        fields: LogFields,
    ) -> LoggingResult<()> {
        self.log_event(LogEvent::with_fields(level, target, message, fields))
    }

    pub fn log_event(&self, event: LogEvent) -> LoggingResult<()> {
        if event.level < self.min_level {
            return Ok(());
        }
        self.sink.log(&event)
    }
}

/// Writes one JSON line per event to stderr, the page-console analogue.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn log(&self, event: &LogEvent) -> LoggingResult<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let mut stderr = io::stderr().lock();
        stderr.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Buffers events in memory so tests can assert on what was logged.
#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().expect("log buffer poisoned").clone()
    }

    /// Count of buffered events whose message matches exactly.
    pub fn count_message(&self, message: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.message == message)
            .count()
    }
}

impl LogSink for MemorySink {
    fn log(&self, event: &LogEvent) -> LoggingResult<()> {
        self.events
            .lock()
            .expect("log buffer poisoned")
            .push(event.clone());
        Ok(())
    }
}

/// Build an event from an iterator of `(key, value)` pairs.
pub fn event_with_fields(
    level: LogLevel,
    target: &str,
    message: &str,
    fields: impl IntoIterator<Item = (String, Value)>,
) -> LogEvent {
    LogEvent::with_fields(level, target, message, fields.into_iter().collect())
}

pub fn json_kv(key: &str, value: impl Into<Value>) -> (String, Value) {
    (key.to_string(), value.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_sink_captures_events() {
        let sink = MemorySink::new();
        let logger = Logger::new(sink.clone());
        logger.log(LogLevel::Info, "marquee::test", "hello").unwrap();
        logger
            .log_event(event_with_fields(
                LogLevel::Warn,
                "marquee::test",
                "uh oh",
                [json_kv("count", json!(3))],
            ))
            .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "hello");
        assert_eq!(events[1].fields.get("count"), Some(&json!(3)));
        assert_eq!(sink.count_message("uh oh"), 1);
    }

    #[test]
    fn level_floor_drops_quieter_events() {
        let sink = MemorySink::new();
        let logger = Logger::new(sink.clone()).with_min_level(LogLevel::Warn);
        logger.log(LogLevel::Debug, "marquee::test", "dropped").unwrap();
        logger.log(LogLevel::Info, "marquee::test", "dropped").unwrap();
        logger.log(LogLevel::Error, "marquee::test", "kept").unwrap();
        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.count_message("kept"), 1);
    }

    #[test]
    fn events_serialize_without_empty_fields() {
        let event = LogEvent::new(LogLevel::Debug, "marquee::test", "bare");
        let line = serde_json::to_string(&event).unwrap();
        assert!(!line.contains("fields"));
    }
}
