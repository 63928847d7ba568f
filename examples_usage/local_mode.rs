use logpet::init::init_tracing;
use logpet::{Logger, LoggerConfig};
use serde_json::json;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

/// Prints every entry to stdout without contacting any intake. Handy
/// during development, where no API key is around.
#[tokio::main]
async fn main() -> logpet::Result<()> {
    let (logger, _handle) = Logger::new(LoggerConfig::local())?;
    logger.set_custom_field("env", "dev");

    logger.http_server_started("8080");
    logger.info(
        "cache warmed",
        Some([("entries".to_string(), json!(1280))].into_iter().collect()),
    );

    // Plain `tracing` events go through the same pipeline.
    init_tracing(&logger)?;
    info!(user_id = 42, "user signed in");
    error!(order_id = 7, "payment declined");

    sleep(Duration::from_millis(200)).await;
    Ok(())
}
