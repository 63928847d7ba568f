use logpet::{Logger, LoggerConfig};
use tokio::time::{sleep, Duration};

/// Ships entries to the intake configured through `LOGPET_*` variables,
/// e.g. `LOGPET_API_KEY=... cargo run --example datadog`.
#[tokio::main]
async fn main() -> logpet::Result<()> {
    let config = LoggerConfig::from_env();
    let (logger, _handle) = Logger::new(config)?;

    logger.set_custom_field("service", "checkout");
    logger.info("checkout service started", None);
    logger.http_client_unauthorized("payments.internal");
    logger.database_get_error("invoice", "acme");

    sleep(Duration::from_secs(2)).await;
    Ok(())
}
