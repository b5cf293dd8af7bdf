//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `KDS_SNAPSHOT_PATH`: order snapshot file (default: unset, no persistence)
/// - `KDS_SNAPSHOT_INTERVAL_SECS`: seconds between snapshot writes (default: `5`)
/// - `KDS_DELIVERY_TIMEOUT_MS`: per-frame socket write timeout (default: `2000`)
/// - `KDS_SUBSCRIBER_BUFFER`: per-terminal outbound queue length; a terminal
///   whose queue fills up is disconnected (default: `64`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_interval: Duration,
    pub delivery_timeout: Duration,
    pub subscriber_buffer: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            snapshot_path: lookup("KDS_SNAPSHOT_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            snapshot_interval: parsed("KDS_SNAPSHOT_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map_or(defaults.snapshot_interval, Duration::from_secs),
            delivery_timeout: parsed("KDS_DELIVERY_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .map_or(defaults.delivery_timeout, Duration::from_millis),
            subscriber_buffer: parsed("KDS_SUBSCRIBER_BUFFER")
                .filter(|n| *n > 0)
                .map_or(defaults.subscriber_buffer, |n| n as usize),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            snapshot_path: None,
            snapshot_interval: Duration::from_secs(5),
            delivery_timeout: Duration::from_secs(2),
            subscriber_buffer: 64,
        }
    }
}
