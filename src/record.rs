use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;
use std::str::FromStr;

/// Custom fields attached to a record or to the whole logger.
pub type Fields = BTreeMap<String, serde_json::Value>;

/// Severity of a [`LogRecord`].
///
/// Serialized as the lowercase `status` string the logs intake expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a persisted `status` does not name a known level.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level {0:?}")]
pub struct UnknownLevel(pub String);

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            other => Err(UnknownLevel(other.to_string())),
        }
    }
}

/// One log event as submitted by a producer.
///
/// Records are immutable once enqueued; the dispatcher consumes each one
/// exactly once.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub fields: Fields,
    /// Overrides the logger-wide hostname for this record only.
    pub hostname: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl LogRecord {
    /// Build a record stamped with the current time and the caller's
    /// source location.
    #[track_caller]
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        let location = Location::caller();
        LogRecord {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            fields: Fields::new(),
            hostname: None,
            file: Some(location.file().to_string()),
            line: Some(location.line()),
        }
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }
}
