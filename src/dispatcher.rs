use crate::entry::{EntryDefaults, JsonFormatter, LogEntry};
use crate::offline::OfflineStore;
use crate::record::{Fields, Level, LogRecord};
use crate::sink::LogSink;
use chrono::{SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Where printed entries go (stdout unless the builder injects a writer).
pub type Console = Arc<Mutex<Box<dyn Write + Send>>>;

/// Called once a fatal record has been fully handled.
pub type ExitHook = Arc<dyn Fn() + Send + Sync>;

/// State shared by every `Logger` clone and the dispatcher task.
pub(crate) struct Shared {
    pub custom_fields: RwLock<Fields>,
    pub debug: AtomicBool,
    pub offline: AtomicBool,
    pub local_mode: bool,
    pub store: Option<OfflineStore>,
    pub defaults: EntryDefaults,
    pub formatter: JsonFormatter,
    pub dropped: AtomicU64,
}

/// Sole consumer of the ingestion channel.
pub(crate) struct Dispatcher {
    pub shared: Arc<Shared>,
    pub sink: Arc<dyn LogSink>,
    pub console: Console,
    pub exit: ExitHook,
}

impl Dispatcher {
    /// Drain the channel one record at a time until every sender is gone
    /// or a fatal record has been handled.
    pub async fn run(self, mut rx: mpsc::Receiver<LogRecord>) {
        while let Some(record) = rx.recv().await {
            let fatal = record.level == Level::Fatal;
            self.dispatch(record).await;

            if fatal {
                (self.exit)();
                break;
            }
        }
        tracing::debug!(target: "logpet", "log dispatcher stopped");
    }

    async fn dispatch(&self, record: LogRecord) {
        let debug = self.shared.debug.load(Ordering::Relaxed);
        if record.level == Level::Debug && !debug {
            return;
        }

        let custom_fields = self.shared.custom_fields.read().clone();
        let entry = LogEntry::from_record(record, &self.shared.defaults, &custom_fields);

        let bytes = match self.shared.formatter.format(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(target: "logpet", error = %e, "error converting log to bytes");
                return;
            }
        };

        if self.shared.local_mode || debug {
            self.print(&bytes);
        }

        if self.shared.local_mode {
            return;
        }

        if let Err(e) = self.sink.send(&entry).await {
            tracing::warn!(target: "logpet", error = %e, "unable to send log to intake");

            if self.shared.offline.load(Ordering::Relaxed) {
                if let Some(store) = &self.shared.store {
                    self.save_offline(store, entry).await;
                }
            }
        }
    }

    async fn save_offline(&self, store: &OfflineStore, mut entry: LogEntry) {
        let now = Utc::now();
        entry.message = format!(
            "OFFLINE LOG at {} | {}",
            now.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.message
        );

        let bytes = match self.shared.formatter.format(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(target: "logpet", error = %e, "error converting offline log to bytes");
                return;
            }
        };

        if let Err(e) = store.persist(&bytes, &store.next_filename(now)).await {
            tracing::error!(target: "logpet", error = %e, "error saving log to file");
        }
    }

    fn print(&self, bytes: &[u8]) {
        let mut out = self.console.lock();
        if let Err(e) = write_line(&mut **out, bytes) {
            tracing::error!(target: "logpet", error = %e, "unable to print log entry");
        }
    }
}

fn write_line(out: &mut dyn Write, bytes: &[u8]) -> std::io::Result<()> {
    out.write_all(bytes)?;
    out.write_all(b"\n")?;
    out.flush()
}
