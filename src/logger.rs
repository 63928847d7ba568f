use crate::config::{LoggerConfig, OverflowPolicy};
use crate::dispatcher::{Console, Dispatcher, ExitHook, Shared};
use crate::entry::{EntryDefaults, JsonFormatter};
use crate::error::{Error, Result};
use crate::layer::dispatching;
use crate::noop_sink::NoopSink;
use crate::offline::{OfflineLog, OfflineStore};
use crate::record::{Fields, Level, LogRecord};
use crate::sink::LogSink;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Minimal capacity of the ingestion channel.
const MIN_CHANNEL_CAPACITY: usize = 16;

/// Cloneable handle used by producers to submit log records.
///
/// Every send operation enqueues onto a bounded channel drained by a
/// single background dispatcher, so callers never wait on delivery.
/// Dropping every clone closes the channel; the dispatcher then drains
/// what is left and its `JoinHandle` completes.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
    sender: mpsc::Sender<LogRecord>,
    backlog: Option<Backlog>,
}

/// Ordered overflow path behind [`OverflowPolicy::Spawn`].
///
/// Records that find the channel full go to an unbounded queue drained by
/// one forwarding task. While anything is pending, `log` queues behind it
/// too, so a single producer's records keep their submission order.
#[derive(Clone)]
struct Backlog {
    tx: mpsc::UnboundedSender<LogRecord>,
    pending: Arc<AtomicUsize>,
}

impl Backlog {
    fn spawn(sender: mpsc::Sender<LogRecord>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogRecord>();
        let pending = Arc::new(AtomicUsize::new(0));

        let forwarded = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if sender.send(record).await.is_err() {
                    tracing::warn!(target: "logpet", "log dispatcher stopped, dropping backlogged log records");
                    break;
                }
                forwarded.fetch_sub(1, Ordering::AcqRel);
            }
        });

        Self { tx, pending }
    }

    fn is_empty(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }

    fn push(&self, record: LogRecord) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(record).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(target: "logpet", "log dispatcher stopped, dropping log record");
        }
    }
}

/// Builder for [`Logger`], allowing the sink, console and exit hook to be
/// replaced.
pub struct LoggerBuilder {
    config: LoggerConfig,
    sink: Option<Arc<dyn LogSink>>,
    console: Option<Console>,
    exit_hook: Option<ExitHook>,
}

impl LoggerBuilder {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            sink: None,
            console: None,
            exit_hook: None,
        }
    }

    /// Deliver through `sink` instead of the default HTTP intake.
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Print local and debug output to `writer` instead of stdout.
    pub fn console<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        let writer: Box<dyn Write + Send> = Box::new(writer);
        self.console = Some(Arc::new(Mutex::new(writer)));
        self
    }

    /// Run `hook` instead of exiting the process after a fatal record.
    pub fn exit_hook<F: Fn() + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.exit_hook = Some(Arc::new(hook));
        self
    }

    /// Validate the configuration, create the ingestion channel and spawn
    /// the dispatcher. Must be called from within a Tokio runtime.
    ///
    /// **Returns**
    /// - the [`Logger`] handle and the dispatcher's `JoinHandle`.
    /// - `Err(Error::Configuration)` when no API key is configured outside
    ///   local mode. Nothing is spawned in that case.
    pub fn build(self) -> Result<(Logger, JoinHandle<()>)> {
        let config = self.config;
        config.validate()?;

        let sink = match self.sink {
            Some(sink) => sink,
            None => default_sink(&config)?,
        };
        let console = self.console.unwrap_or_else(|| {
            let stdout: Box<dyn Write + Send> = Box::new(std::io::stdout());
            Arc::new(Mutex::new(stdout))
        });
        let exit: ExitHook = self
            .exit_hook
            .unwrap_or_else(|| Arc::new(|| std::process::exit(1)));

        let store = config.offline_logs_path.as_ref().map(OfflineStore::new);
        let shared = Arc::new(Shared {
            custom_fields: RwLock::new(Fields::new()),
            debug: AtomicBool::new(config.send_debug_logs),
            offline: AtomicBool::new(store.is_some()),
            local_mode: config.local_mode,
            store,
            defaults: EntryDefaults {
                source: config.source.clone(),
                hostname: config.hostname.clone(),
                service: config.service.clone(),
            },
            formatter: JsonFormatter::new(config.pretty_print),
            dropped: AtomicU64::new(0),
        });

        let (sender, rx) = mpsc::channel(config.channel_capacity.max(MIN_CHANNEL_CAPACITY));
        let dispatcher = Dispatcher {
            shared: Arc::clone(&shared),
            sink,
            console,
            exit,
        };
        let handle = tokio::spawn(dispatching(dispatcher.run(rx)));
        let backlog = match config.overflow {
            OverflowPolicy::Spawn => Some(Backlog::spawn(sender.clone())),
            OverflowPolicy::Drop => None,
        };

        tracing::debug!(
            target: "logpet",
            endpoint = config.endpoint(),
            local_mode = config.local_mode,
            "logger started"
        );

        Ok((
            Logger {
                shared,
                sender,
                backlog,
            },
            handle,
        ))
    }
}

fn default_sink(config: &LoggerConfig) -> Result<Arc<dyn LogSink>> {
    if config.local_mode {
        return Ok(Arc::new(NoopSink));
    }

    #[cfg(feature = "datadog")]
    {
        use crate::datadog::{DatadogConfig, DatadogSink};

        let sink = DatadogSink::new(DatadogConfig {
            endpoint: config.endpoint().to_string(),
            api_key: config.api_key.clone(),
        })?;
        Ok(Arc::new(sink))
    }

    #[cfg(not(feature = "datadog"))]
    {
        Err(Error::Configuration(
            "datadog feature is not enabled; provide a sink".to_string(),
        ))
    }
}

impl Logger {
    /// Set up a logger with the default sink, console and exit behavior.
    pub fn new(config: LoggerConfig) -> Result<(Logger, JoinHandle<()>)> {
        LoggerBuilder::new(config).build()
    }

    pub fn builder(config: LoggerConfig) -> LoggerBuilder {
        LoggerBuilder::new(config)
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>, fields: Option<Fields>) {
        self.log(record(Level::Debug, message, fields));
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>, fields: Option<Fields>) {
        self.log(record(Level::Info, message, fields));
    }

    #[track_caller]
    pub fn warn(&self, message: impl Into<String>, fields: Option<Fields>) {
        self.log(record(Level::Warning, message, fields));
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>, fields: Option<Fields>) {
        self.log(record(Level::Error, message, fields));
    }

    /// Enqueue a fatal record, waiting for channel capacity.
    ///
    /// The dispatcher handles the record like any other, then runs the
    /// exit hook (by default `std::process::exit(1)`) and stops. Under
    /// [`OverflowPolicy::Spawn`] a non-empty backlog takes the record
    /// instead, behind the records submitted before it.
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>, fields: Option<Fields>) -> impl Future<Output = ()> + '_ {
        let record = record(Level::Fatal, message, fields);
        async move {
            if let Some(backlog) = self.pending_backlog() {
                backlog.push(record);
                return;
            }
            if self.sender.send(record).await.is_err() {
                tracing::warn!(target: "logpet", "log dispatcher stopped, dropping fatal log record");
            }
        }
    }

    /// Enqueue a prebuilt record without waiting.
    ///
    /// A full channel is handled according to the configured
    /// [`OverflowPolicy`]; a closed one drops the record.
    pub fn log(&self, record: LogRecord) {
        if let Some(backlog) = self.pending_backlog() {
            backlog.push(record);
            return;
        }

        let record = match self.sender.try_send(record) {
            Ok(()) => return,
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(target: "logpet", "log dispatcher stopped, dropping log record");
                return;
            }
            Err(TrySendError::Full(record)) => record,
        };

        match &self.backlog {
            Some(backlog) => backlog.push(record),
            None => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(target: "logpet", "log channel full, dropping log record");
            }
        }
    }

    fn pending_backlog(&self) -> Option<&Backlog> {
        self.backlog.as_ref().filter(|backlog| !backlog.is_empty())
    }

    /// Re-enqueue every persisted offline log, removing each file once its
    /// record is back on the channel.
    ///
    /// Files that cannot be read or decoded, or whose `status` is not a
    /// known level, are logged and left in place for the next call. Fatal
    /// entries come back as errors prefixed with `EX FATAL` so a replay
    /// never terminates the process.
    ///
    /// **Returns**
    /// - the number of records re-enqueued (`0` for an empty directory).
    /// - `Err(Error::Configuration)` if no offline path is configured.
    /// - `Err(Error::Persistence)` if the directory cannot be listed.
    pub async fn send_offline_logs(&self) -> Result<usize> {
        let store = self
            .shared
            .store
            .as_ref()
            .ok_or_else(|| Error::Configuration("offline logs path is not configured".to_string()))?;

        let mut replayed = 0;
        for path in store.list().await? {
            let record = match store.load(&path).await.and_then(|log| replay_record(&path, log)) {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(target: "logpet", error = %e, "skipping offline log");
                    continue;
                }
            };

            if self.sender.send(record).await.is_err() {
                tracing::warn!(target: "logpet", "log dispatcher stopped, offline replay interrupted");
                break;
            }
            replayed += 1;

            if let Err(e) = store.remove(&path).await {
                tracing::error!(target: "logpet", error = %e, "unable to remove offline log");
            }
        }

        Ok(replayed)
    }

    pub fn set_debug_mode(&self, enabled: bool) {
        self.shared.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn debug_mode(&self) -> bool {
        self.shared.debug.load(Ordering::Relaxed)
    }

    /// Toggle offline persistence. Has no effect without an offline path.
    pub fn enable_offline_logs(&self, enabled: bool) {
        if enabled && self.shared.store.is_none() {
            tracing::warn!(target: "logpet", "offline logs path is not configured, ignoring");
            return;
        }
        self.shared.offline.store(enabled, Ordering::Relaxed);
    }

    pub fn offline_logs_enabled(&self) -> bool {
        self.shared.offline.load(Ordering::Relaxed)
    }

    pub fn offline_logs_path(&self) -> Option<&Path> {
        self.shared.store.as_ref().map(OfflineStore::dir)
    }

    pub fn is_local_mode(&self) -> bool {
        self.shared.local_mode
    }

    /// Attach `key` to every subsequent entry.
    pub fn set_custom_field(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.shared.custom_fields.write().insert(key.into(), value.into());
    }

    pub fn remove_custom_field(&self, key: &str) -> Option<serde_json::Value> {
        self.shared.custom_fields.write().remove(key)
    }

    /// Replace all logger-wide custom fields.
    pub fn set_custom_fields(&self, fields: Fields) {
        *self.shared.custom_fields.write() = fields;
    }

    pub fn custom_fields(&self) -> Fields {
        self.shared.custom_fields.read().clone()
    }

    /// Records dropped because the channel was full.
    pub fn dropped_records(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

#[track_caller]
fn record(level: Level, message: impl Into<String>, fields: Option<Fields>) -> LogRecord {
    LogRecord::new(level, message).with_fields(fields.unwrap_or_default())
}

fn replay_record(path: &Path, log: OfflineLog) -> Result<LogRecord> {
    let level: Level = log.status.parse().map_err(|e| Error::decode(path, e))?;
    let record = match level {
        Level::Fatal => LogRecord::new(Level::Error, format!("EX FATAL | {}", log.message)),
        level => LogRecord::new(level, log.message),
    };
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LogEntry;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LogSink for RecordingSink {
        async fn send(&self, entry: &LogEntry) -> Result<()> {
            self.entries.lock().push(entry.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl LogSink for FailingSink {
        async fn send(&self, _entry: &LogEntry) -> Result<()> {
            Err(Error::Delivery {
                status: "503 Service Unavailable".to_string(),
                body: String::new(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    fn remote_config() -> LoggerConfig {
        LoggerConfig {
            api_key: "K".into(),
            pretty_print: false,
            ..LoggerConfig::default()
        }
    }

    #[tokio::test]
    async fn missing_api_key_fails_setup() {
        let result = Logger::new(LoggerConfig::default());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn debug_records_are_suppressed_unless_enabled() {
        let sink = Arc::new(RecordingSink::default());
        let console = SharedBuf::default();
        let (logger, handle) = Logger::builder(remote_config())
            .sink(sink.clone())
            .console(console.clone())
            .build()
            .unwrap();

        logger.debug("hidden", None);
        logger.info("visible", None);
        drop(logger);
        handle.await.unwrap();

        let entries = sink.entries.lock();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "visible");
        assert!(console.contents().is_empty());
    }

    #[tokio::test]
    async fn debug_mode_ships_and_prints_debug_records() {
        let sink = Arc::new(RecordingSink::default());
        let console = SharedBuf::default();
        let (logger, handle) = Logger::builder(remote_config())
            .sink(sink.clone())
            .console(console.clone())
            .build()
            .unwrap();

        logger.set_debug_mode(true);
        logger.debug("query took 3ms", None);
        drop(logger);
        handle.await.unwrap();

        assert_eq!(sink.entries.lock()[0].status, Level::Debug);
        assert!(console.contents().contains("query took 3ms"));
    }

    #[tokio::test]
    async fn custom_fields_are_merged_into_entries() {
        let sink = Arc::new(RecordingSink::default());
        let (logger, handle) = Logger::builder(remote_config())
            .sink(sink.clone())
            .build()
            .unwrap();

        logger.set_custom_field("env", "prod");
        logger.set_custom_field("region", "eu-west-1");
        assert_eq!(logger.remove_custom_field("region"), Some(json!("eu-west-1")));

        let mut fields = Fields::new();
        fields.insert("order_id".into(), json!(17));
        logger.error("payment declined", Some(fields));
        drop(logger);
        handle.await.unwrap();

        let entries = sink.entries.lock();
        assert_eq!(entries[0].fields["env"], json!("prod"));
        assert_eq!(entries[0].fields["order_id"], json!(17));
        assert!(!entries[0].fields.contains_key("region"));
        assert_eq!(entries[0].file.as_deref(), Some(file!()));
    }

    #[tokio::test]
    async fn fatal_runs_exit_hook_after_delivery_and_stops() {
        let sink = Arc::new(RecordingSink::default());
        let delivered_at_exit = Arc::new(AtomicUsize::new(usize::MAX));
        let hook_sink = Arc::clone(&sink);
        let hook_seen = Arc::clone(&delivered_at_exit);

        let (logger, handle) = Logger::builder(remote_config())
            .sink(sink.clone())
            .exit_hook(move || {
                hook_seen.store(hook_sink.entries.lock().len(), Ordering::SeqCst);
            })
            .build()
            .unwrap();

        logger.info("before", None);
        logger.fatal("cannot continue", None).await;
        handle.await.unwrap();

        assert_eq!(delivered_at_exit.load(Ordering::SeqCst), 2);

        // The dispatcher is gone; later records go nowhere.
        logger.info("after", None);
        assert_eq!(sink.entries.lock().len(), 2);
    }

    #[tokio::test]
    async fn failed_delivery_is_persisted_only_when_offline_enabled() {
        let tmp = TempDir::new().unwrap();
        let config = LoggerConfig {
            offline_logs_path: Some(tmp.path().to_path_buf()),
            ..remote_config()
        };
        let (logger, handle) = Logger::builder(config)
            .sink(Arc::new(FailingSink))
            .build()
            .unwrap();

        assert!(logger.offline_logs_enabled());
        logger.enable_offline_logs(false);
        logger.error("lost", None);
        drop(logger);
        handle.await.unwrap();

        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn replay_requires_offline_path() {
        let (logger, _handle) = Logger::builder(LoggerConfig::local())
            .console(SharedBuf::default())
            .build()
            .unwrap();

        let err = logger.send_offline_logs().await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn replay_maps_fatal_to_error() {
        let record = replay_record(
            Path::new("log-x.json"),
            OfflineLog {
                status: "fatal".into(),
                message: "db down".into(),
            },
        )
        .unwrap();
        assert_eq!(record.level, Level::Error);
        assert_eq!(record.message, "EX FATAL | db down");

        let err = replay_record(
            Path::new("log-y.json"),
            OfflineLog {
                status: "trace".into(),
                message: "?".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn full_channel_drops_and_counts() {
        let config = LoggerConfig {
            channel_capacity: 0,
            ..LoggerConfig::local()
        };
        let (logger, handle) = Logger::builder(config)
            .console(SharedBuf::default())
            .build()
            .unwrap();

        // The current-thread test runtime cannot run the dispatcher until
        // this test yields, so the channel fills up.
        for i in 0..(MIN_CHANNEL_CAPACITY + 4) {
            logger.info(format!("record {}", i), None);
        }
        assert_eq!(logger.dropped_records(), 4);

        drop(logger);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn spawn_policy_backlogs_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let config = LoggerConfig {
            channel_capacity: 0,
            overflow: OverflowPolicy::Spawn,
            ..remote_config()
        };
        let (logger, handle) = Logger::builder(config)
            .sink(sink.clone())
            .exit_hook(|| {})
            .build()
            .unwrap();

        for i in 0..(MIN_CHANNEL_CAPACITY * 3) {
            logger.info(format!("record {}", i), None);
        }
        logger.fatal("last", None).await;
        assert_eq!(logger.dropped_records(), 0);

        drop(logger);
        handle.await.unwrap();

        let messages: Vec<String> = sink.entries.lock().iter().map(|e| e.message.clone()).collect();
        let mut expected: Vec<String> = (0..MIN_CHANNEL_CAPACITY * 3).map(|i| format!("record {}", i)).collect();
        expected.push("last".to_string());
        assert_eq!(messages, expected);
    }
}
