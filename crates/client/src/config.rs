use std::time::Duration;

use crate::reconnect::ReconnectConfig;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RECONNECT_INITIAL_MS: u64 = 1000;
pub const DEFAULT_RECONNECT_MAX_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend running locally.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    /// WebSocket URL of the status push channel.
    pub ws_url: String,
    /// Per-request timeout for REST calls.
    pub request_timeout: Duration,
    /// Backoff used when the push connection drops.
    pub reconnect: ReconnectConfig,
}

/// A configuration variable was set to an unusable value.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {var}: '{value}' ({reason})")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                        | Default                  |
    /// |--------------------------------|--------------------------|
    /// | `EXPHUB_API_URL`               | `http://localhost:8000`  |
    /// | `EXPHUB_WS_URL`                | `ws://localhost:8000/ws` |
    /// | `EXPHUB_REQUEST_TIMEOUT_SECS`  | `30`                     |
    /// | `EXPHUB_RECONNECT_INITIAL_MS`  | `1000`                   |
    /// | `EXPHUB_RECONNECT_MAX_SECS`    | `30`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("EXPHUB_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.into())
            .trim_end_matches('/')
            .to_string();
        let ws_url = lookup("EXPHUB_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.into());

        let timeout_secs = parse_u64(
            &lookup,
            "EXPHUB_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let initial_ms = parse_u64(
            &lookup,
            "EXPHUB_RECONNECT_INITIAL_MS",
            DEFAULT_RECONNECT_INITIAL_MS,
        )?;
        let max_secs = parse_u64(&lookup, "EXPHUB_RECONNECT_MAX_SECS", DEFAULT_RECONNECT_MAX_SECS)?;

        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            return Err(ConfigError {
                var: "EXPHUB_WS_URL",
                value: ws_url,
                reason: "must start with ws:// or wss://".into(),
            });
        }

        Ok(Self {
            api_url,
            ws_url,
            request_timeout: Duration::from_secs(timeout_secs),
            reconnect: ReconnectConfig {
                initial_delay: Duration::from_millis(initial_ms),
                max_delay: Duration::from_secs(max_secs),
                ..ReconnectConfig::default()
            },
        })
    }
}

fn parse_u64<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError {
            var,
            value: raw,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
