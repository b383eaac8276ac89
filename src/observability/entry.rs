//! Structured request-log records.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Severity of a request-log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// 5xx → error, 4xx → warn, anything else → info.
    pub fn for_status(status: u16) -> Self {
        match status {
            500.. => LogLevel::Error,
            400..=499 => LogLevel::Warn,
            _ => LogLevel::Info,
        }
    }

    /// Message text that accompanies a request record at this level.
    pub fn request_message(self) -> &'static str {
        match self {
            LogLevel::Error => "Server error",
            LogLevel::Warn => "Client error",
            LogLevel::Info => "Request processed",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// One immutable log record: level, message and an ordered set of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    level: LogLevel,
    message: String,
    fields: Vec<(&'static str, Value)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field; insertion order is preserved on output.
    pub fn with_field(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((key, value.into()));
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> &[(&'static str, Value)] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Render the fields alone as a JSON object string.
    pub fn fields_json(&self) -> String {
        serde_json::to_string(&FieldsView(&self.fields)).unwrap_or_default()
    }
}

impl Serialize for LogEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        map.serialize_entry("level", self.level.as_str())?;
        map.serialize_entry("message", &self.message)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct FieldsView<'a>(&'a [(&'static str, Value)]);

impl Serialize for FieldsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Per-request outcome captured by the instrumentation layer.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub remote_addr: String,
    pub duration: Duration,
    pub status: u16,
    pub user_agent: String,
    pub request_id: String,
    pub response_size: u64,
}

impl RequestRecord {
    /// Build the log entry with the fixed field order of the access-log contract.
    pub fn into_entry(self) -> LogEntry {
        let level = LogLevel::for_status(self.status);
        LogEntry::new(level, level.request_message())
            .with_field("timestamp", self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
            .with_field("method", self.method)
            .with_field("path", self.path)
            .with_field("remote_addr", self.remote_addr)
            .with_field("duration_ms", self.duration.as_millis() as u64)
            .with_field("status", self.status)
            .with_field("user_agent", self.user_agent)
            .with_field("request_id", self.request_id)
            .with_field("response_size", self.response_size)
    }
}
