#![cfg(feature = "datadog")]

mod common;

use common::SharedBuf;
use logpet::init::{init_tracing_with_writer, TracingConfig};
use logpet::{Logger, LoggerConfig};
use tokio::time::{sleep, Duration, Instant};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

// One global subscriber per process, so this binary holds a single test.
#[tokio::test]
async fn delivery_events_stay_out_of_the_pipeline_and_failures_reach_stderr() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = LoggerConfig {
        remote_endpoint: format!("{}/v1/input", server.uri()),
        api_key: "K".to_string(),
        send_debug_logs: true,
        pretty_print: false,
        ..LoggerConfig::default()
    };
    let (logger, _handle) = Logger::builder(config)
        .console(SharedBuf::default())
        .build()
        .unwrap();

    let diagnostics = SharedBuf::default();
    let writer = diagnostics.clone();
    init_tracing_with_writer(&logger, TracingConfig::default(), move || writer.clone()).unwrap();

    tracing::info!("one record");
    logger.warn("another record", None);

    let deadline = Instant::now() + Duration::from_secs(5);
    while server.received_requests().await.unwrap().len() < 2 && Instant::now() < deadline {
        sleep(Duration::from_millis(10)).await;
    }
    // Give any echoed client events time to come back around.
    sleep(Duration::from_millis(500)).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let diagnostics = diagnostics.contents();
    assert!(diagnostics.contains("unable to send log to intake"), "{}", diagnostics);
    assert!(diagnostics.contains("500"), "{}", diagnostics);
    assert!(!diagnostics.contains("hyper"), "{}", diagnostics);
}
