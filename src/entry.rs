use crate::error::Result;
use crate::record::{Fields, Level, LogRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Keys owned by [`LogEntry`] itself.
const RESERVED_KEYS: [&str; 8] = ["date", "status", "message", "source", "hostname", "service", "file", "line"];

/// Fully enriched document sent to the logs intake and written to
/// offline files.
///
/// Custom fields are flattened next to the default keys; a custom field
/// named like a default key is dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    #[serde(with = "rfc3339_nanos")]
    pub date: DateTime<Utc>,
    pub status: Level,
    pub message: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(flatten)]
    pub fields: Fields,
}

/// Process-wide defaults stamped on every entry.
#[derive(Debug, Clone)]
pub struct EntryDefaults {
    pub source: String,
    pub hostname: Option<String>,
    pub service: Option<String>,
}

impl LogEntry {
    /// Enrich `record` with the defaults and the logger-wide custom fields.
    /// Record fields win over logger fields on key collisions.
    pub fn from_record(record: LogRecord, defaults: &EntryDefaults, custom_fields: &Fields) -> Self {
        let mut fields = custom_fields.clone();
        fields.extend(record.fields);
        fields.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));

        LogEntry {
            date: record.timestamp,
            status: record.level,
            message: record.message,
            source: defaults.source.clone(),
            hostname: record.hostname.or_else(|| defaults.hostname.clone()),
            service: defaults.service.clone(),
            file: record.file,
            line: record.line,
            fields,
        }
    }
}

/// Turns [`LogEntry`]s into JSON payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn format(&self, entry: &LogEntry) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(entry)?
        } else {
            serde_json::to_vec(entry)?
        };
        Ok(bytes)
    }
}

mod rfc3339_nanos {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
