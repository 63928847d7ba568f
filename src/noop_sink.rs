use crate::entry::LogEntry;
use crate::error::Result;
use crate::sink::LogSink;
use async_trait::async_trait;

/// A sink that accepts and drops every entry.
///
/// Installed in local mode, where the dispatcher only prints.
#[derive(Clone, Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _entry: &LogEntry) -> Result<()> {
        Ok(())
    }
}
