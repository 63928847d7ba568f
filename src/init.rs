use crate::error::{Error, Result};
use crate::layer::{is_own_target, LogpetLayer};
use crate::logger::Logger;
use tracing::Metadata;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::Registry;

/// Options for [`init_tracing_with_config`].
///
/// **Fields**
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top of [`LogpetLayer`] so events are also printed by
///   `tracing` itself. Off by default, since the logger already prints in
///   local and debug mode.
///
/// The logger's own warnings and errors (delivery, persistence, dropped
/// records) are always written to stderr.
#[derive(Clone, Debug, Default)]
pub struct TracingConfig {
    pub enable_stdout: bool,
}

/// Install a global `tracing` subscriber that forwards every event to
/// `logger`.
///
/// **Returns**
/// - `Err(Error::Configuration)` if a global subscriber is already set.
pub fn init_tracing_with_config(logger: &Logger, config: TracingConfig) -> Result<()> {
    init_tracing_with_writer(logger, config, std::io::stderr)
}

/// Like [`init_tracing_with_config`], writing the logger's own diagnostics
/// to `diagnostics` instead of stderr.
pub fn init_tracing_with_writer<W>(logger: &Logger, config: TracingConfig, diagnostics: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = LogpetLayer::new(logger.clone());
    let diagnostics = tracing_subscriber::fmt::layer()
        .with_writer(diagnostics)
        .with_ansi(false)
        .with_filter(filter_fn(is_diagnostic));

    // The two subscriber shapes have different types, hence two branches.
    let installed = if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|meta| !is_own_target(meta.target())));
        let subscriber = Registry::default().with(layer).with(diagnostics).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer).with(diagnostics);
        tracing::subscriber::set_global_default(subscriber)
    };

    installed.map_err(|e| Error::Configuration(format!("unable to install tracing subscriber: {}", e)))
}

/// Install the subscriber with [`TracingConfig::default`].
pub fn init_tracing(logger: &Logger) -> Result<()> {
    init_tracing_with_config(logger, TracingConfig::default())
}

fn is_diagnostic(meta: &Metadata<'_>) -> bool {
    is_own_target(meta.target()) && *meta.level() <= tracing::Level::WARN
}

