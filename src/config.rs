use crate::error::{Error, Result};
use std::path::PathBuf;

/// Logs intake used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "https://http-intake.logs.datadoghq.com/v1/input";

/// Source tag stamped on every entry unless overridden.
pub const DEFAULT_SOURCE: &str = "logpet";

/// Environment variable names read by [`LoggerConfig::from_env`].
pub const LOGPET_ENDPOINT_ENV: &str = "LOGPET_ENDPOINT";
pub const LOGPET_API_KEY_ENV: &str = "LOGPET_API_KEY";
/// Consulted when `LOGPET_API_KEY` is unset.
pub const DD_API_KEY_ENV: &str = "DD_API_KEY";
pub const LOGPET_OFFLINE_LOGS_PATH_ENV: &str = "LOGPET_OFFLINE_LOGS_PATH";
pub const LOGPET_SEND_DEBUG_LOGS_ENV: &str = "LOGPET_SEND_DEBUG_LOGS";
pub const LOGPET_LOCAL_MODE_ENV: &str = "LOGPET_LOCAL_MODE";
pub const LOGPET_HOSTNAME_ENV: &str = "LOGPET_HOSTNAME";
pub const LOGPET_SERVICE_ENV: &str = "LOGPET_SERVICE";

/// What a producer does when the ingestion channel is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the new record and count it.
    #[default]
    Drop,
    /// Spawn a task that waits for capacity, then enqueues.
    Spawn,
}

/// Logger configuration.
///
/// **Fields**
/// - `remote_endpoint`: logs intake URL; empty means [`DEFAULT_ENDPOINT`].
/// - `api_key`: sent as `DD-API-KEY`; required unless `local_mode`.
/// - `offline_logs_path`: enables offline persistence when set.
/// - `send_debug_logs`: deliver debug records and echo everything to stdout.
/// - `local_mode`: print only, never contact the intake.
/// - `channel_capacity`: bound of the ingestion channel (at least 16).
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub remote_endpoint: String,
    pub api_key: String,
    pub offline_logs_path: Option<PathBuf>,
    pub send_debug_logs: bool,
    pub local_mode: bool,
    pub hostname: Option<String>,
    pub service: Option<String>,
    pub source: String,
    pub pretty_print: bool,
    pub channel_capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            remote_endpoint: String::new(),
            api_key: String::new(),
            offline_logs_path: None,
            send_debug_logs: false,
            local_mode: false,
            hostname: None,
            service: None,
            source: DEFAULT_SOURCE.to_string(),
            pretty_print: true,
            channel_capacity: 1024,
            overflow: OverflowPolicy::Drop,
        }
    }
}

impl LoggerConfig {
    /// Configuration for a logger that prints locally and never ships.
    pub fn local() -> Self {
        Self {
            local_mode: true,
            ..Self::default()
        }
    }

    /// Build a configuration from `LOGPET_*` environment variables,
    /// falling back to [`LoggerConfig::default`] for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = std::env::var(LOGPET_API_KEY_ENV)
            .or_else(|_| std::env::var(DD_API_KEY_ENV))
            .unwrap_or_default();

        Self {
            remote_endpoint: env_or(LOGPET_ENDPOINT_ENV, ""),
            api_key,
            offline_logs_path: env_opt(LOGPET_OFFLINE_LOGS_PATH_ENV).map(PathBuf::from),
            send_debug_logs: env_flag(LOGPET_SEND_DEBUG_LOGS_ENV),
            local_mode: env_flag(LOGPET_LOCAL_MODE_ENV),
            hostname: env_opt(LOGPET_HOSTNAME_ENV),
            service: env_opt(LOGPET_SERVICE_ENV),
            ..defaults
        }
    }

    /// The endpoint actually used for delivery.
    pub fn endpoint(&self) -> &str {
        if self.remote_endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            &self.remote_endpoint
        }
    }

    /// Reject configurations that cannot ship logs.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() && !self.local_mode {
            return Err(Error::Configuration("no API Key provided".to_string()));
        }
        Ok(())
    }
}

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
