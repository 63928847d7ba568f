use crate::logger::Logger;
use crate::record::{Fields, Level, LogRecord};
use chrono::Utc;
use serde_json::Value;
use std::future::Future;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

tokio::task_local! {
    /// Set on the dispatcher task while it formats and delivers records.
    static DISPATCHING: ();
}

/// Run `future` with events it raises hidden from [`LogpetLayer`].
pub(crate) async fn dispatching<F: Future>(future: F) -> F::Output {
    DISPATCHING.scope((), future).await
}

fn in_dispatcher() -> bool {
    DISPATCHING.try_with(|_| ()).is_ok()
}

/// Crates whose events describe delivery itself. The HTTP client spawns
/// connection tasks outside the dispatcher, so these are matched by target.
const TRANSPORT_TARGETS: &[&str] = &["hyper", "reqwest", "h2", "rustls", "want", "tower"];

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// hands them to a [`Logger`].
///
/// Network I/O stays on the logger's dispatcher task; `on_event` only
/// enqueues. Events emitted by this crate (target `logpet`), by the HTTP
/// client stack, or from inside the dispatcher are skipped so delivery
/// never feeds back into the pipeline.
pub struct LogpetLayer {
    logger: Logger,
}

impl LogpetLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for LogpetLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_own_target(meta.target()) || is_transport_target(meta.target()) || in_dispatcher() {
            return;
        }

        let mut visitor = EventFields::default();
        event.record(&mut visitor);

        let mut fields = visitor.fields;
        fields.insert("logger.name".to_string(), Value::from(meta.target()));

        self.logger.log(LogRecord {
            timestamp: Utc::now(),
            level: level_from_tracing(meta.level()),
            message: visitor.message.unwrap_or_default(),
            fields,
            hostname: None,
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
        });
    }
}

pub(crate) fn is_own_target(target: &str) -> bool {
    has_root(target, "logpet")
}

fn is_transport_target(target: &str) -> bool {
    TRANSPORT_TARGETS.iter().any(|root| has_root(target, root))
}

fn has_root(target: &str, root: &str) -> bool {
    match target.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}

fn level_from_tracing(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warning,
        tracing::Level::INFO => Level::Info,
        _ => Level::Debug,
    }
}

/// Collects an event's fields; a string `message` becomes the record message.
#[derive(Default)]
struct EventFields {
    message: Option<String>,
    fields: Fields,
}

impl EventFields {
    fn put(&mut self, field: &Field, value: Value) {
        match (field.name(), value) {
            ("message", Value::String(message)) => self.message = Some(message),
            (name, value) => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{:?}", value)));
    }
}
