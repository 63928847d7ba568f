use logpet::{Logger, LoggerConfig};
use tokio::time::{sleep, Duration};

/// Points the logger at an intake that is not listening so every entry
/// lands in the offline directory, then replays them.
#[tokio::main]
async fn main() -> logpet::Result<()> {
    let dir = std::env::temp_dir().join("logpet-offline");
    let config = LoggerConfig {
        remote_endpoint: "http://127.0.0.1:9/v1/input".to_string(),
        api_key: "demo".to_string(),
        offline_logs_path: Some(dir.clone()),
        ..LoggerConfig::default()
    };
    let (logger, _handle) = Logger::new(config)?;

    logger.warn("disk usage high", None);
    logger.error("upstream timeout", None);
    sleep(Duration::from_secs(1)).await;

    println!("offline logs saved under {}", dir.display());

    // Nothing is listening yet, so the replayed entries fail again and are
    // saved under new names.
    let replayed = logger.send_offline_logs().await?;
    println!("replayed {} offline logs", replayed);

    sleep(Duration::from_secs(1)).await;
    Ok(())
}
