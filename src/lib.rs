//! sensor-relay: fans sensor telemetry posted over HTTP out to live
//! WebSocket dashboards.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod logging;
pub mod producer;
pub mod relay;
pub mod server;

pub use config::RelayConfig;
pub use domain::TelemetryReading;
pub use error::{RelayError, Result};
pub use relay::Relay;
