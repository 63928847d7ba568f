//! Structured logging helpers that ship entries to a Datadog-compatible
//! logs intake from a background task, persist failed deliveries to disk
//! and replay them on demand.

pub mod config;
pub mod entry;
pub mod error;
pub mod init;
pub mod layer;
pub mod logger;
pub mod messages;
pub mod noop_sink;
pub mod offline;
pub mod record;
pub mod request;
pub mod sink;

#[cfg(feature = "datadog")]
pub mod datadog;

mod dispatcher;

pub use config::{LoggerConfig, OverflowPolicy, DEFAULT_ENDPOINT};
pub use entry::LogEntry;
pub use error::{Error, Result};
pub use logger::{Logger, LoggerBuilder};
pub use record::{Fields, Level, LogRecord};
pub use sink::LogSink;
