//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `relay.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: where the relay listens and which directory it serves.
//!     - DashboardConfig: relay origin, gap watchdog period, alert threshold.
//!     - ProducerConfig: where the simulated sensor node posts, and how often.
//!     - LoggingConfig: log level and output format.
//!
//! every section is optional in the file; missing keys take their defaults.
//! command line flags (and the PORT environment variable) win over the file.
//!
//! ==============================================================================

use crate::error::{RelayError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// port used when neither PORT, --port nor the config file set one
pub const DEFAULT_PORT: u16 = 3000;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub dashboard: DashboardConfig,
    pub producer: ProducerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// directory holding index.html, script.js and style.css
    pub static_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// the page origin the dashboard was "loaded" from; the websocket
    /// address is derived from it
    pub origin: String,
    pub watchdog_ms: u64,
    /// ultrasonic distance (meters) above which the alert is shown
    pub alert_threshold_m: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProducerConfig {
    pub relay_url: String,
    pub interval_ms: u64,
    /// stop after this many readings; run until ctrl-c when unset
    pub count: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// emit one json object per line instead of the human format
    pub json: bool,
    pub show_sensor_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from("public"),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            origin: format!("http://127.0.0.1:{}", DEFAULT_PORT),
            watchdog_ms: 1000,
            alert_threshold_m: 2.0,
        }
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            relay_url: format!("http://127.0.0.1:{}", DEFAULT_PORT),
            interval_ms: 500,
            count: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false, show_sensor_data: true }
    }
}

impl RelayConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RelayError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| RelayError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Pick the config file to load.
    ///
    /// an explicit path is always returned (and must then load); otherwise
    /// `config/relay.toml` and `../config/relay.toml` are tried in turn.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        [
            PathBuf::from("config").join("relay.toml"),
            PathBuf::from("..").join("config").join("relay.toml"),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Load the located file, or defaults when there is none
    pub fn load_or_default(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match Self::locate(explicit) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Log configuration summary
    pub fn print_summary(&self) {
        tracing::info!(
            bind = %self.server.bind,
            port = self.server.port,
            static_dir = %self.server.static_dir.display(),
            "server"
        );
        tracing::info!(
            origin = %self.dashboard.origin,
            watchdog_ms = self.dashboard.watchdog_ms,
            alert_threshold_m = self.dashboard.alert_threshold_m,
            "dashboard"
        );
        tracing::info!(
            relay_url = %self.producer.relay_url,
            interval_ms = self.producer.interval_ms,
            "producer"
        );
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
