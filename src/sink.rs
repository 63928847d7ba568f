use crate::entry::LogEntry;
use crate::error::Result;
use async_trait::async_trait;

/// Asynchronous destination for [`LogEntry`]s produced by the dispatcher.
///
/// Implementations transport one entry per call to a concrete collector.
/// The dispatcher calls `send` from its background task and never awaits
/// it on the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver a single entry.
    ///
    /// **Returns**
    /// - `Ok(())` if the collector accepted the entry.
    /// - `Err(..)` on transport failure or a rejected status. The
    ///   dispatcher does not retry; with offline mode enabled the entry
    ///   is persisted to disk instead.
    async fn send(&self, entry: &LogEntry) -> Result<()>;
}
