use crate::entry::LogEntry;
use crate::error::{Error, Result};
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};

/// Header carrying the intake API key (`DD-API-KEY`; header names are
/// case-insensitive and `http` stores them lowercase).
pub const API_KEY_HEADER: &str = "dd-api-key";

/// Configuration for [`DatadogSink`].
#[derive(Clone, Debug)]
pub struct DatadogConfig {
    /// Full intake URL, e.g. "https://http-intake.logs.datadoghq.com/v1/input"
    pub endpoint: String,
    pub api_key: String,
}

/// Datadog-compatible HTTP logs intake implementation of [`LogSink`].
///
/// Posts one JSON entry per request. Anything but `200 OK` counts as a
/// failed delivery.
#[derive(Clone, Debug)]
pub struct DatadogSink {
    client: Client,
    endpoint: reqwest::Url,
    headers: HeaderMap,
}

impl DatadogSink {
    /// Construct a new sink instance using the provided configuration.
    ///
    /// **Returns**
    /// - `Err(Error::Configuration)` if the endpoint is not a valid URL
    ///   or the API key cannot be sent as a header value.
    pub fn new(config: DatadogConfig) -> Result<Self> {
        Self::with_client(Client::new(), config)
    }

    /// Same as [`DatadogSink::new`] but reusing an existing client.
    pub fn with_client(client: Client, config: DatadogConfig) -> Result<Self> {
        let endpoint = reqwest::Url::parse(&config.endpoint)
            .map_err(|e| Error::Configuration(format!("invalid logs endpoint {}: {}", config.endpoint, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| Error::Configuration("API key is not a valid header value".to_string()))?;
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);

        Ok(Self {
            client,
            endpoint,
            headers,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl LogSink for DatadogSink {
    async fn send(&self, entry: &LogEntry) -> Result<()> {
        let body = serde_json::to_vec(entry)?;
        let resp = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::OK {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(Error::Delivery {
                status: status.to_string(),
                body,
            })
        }
    }
}
