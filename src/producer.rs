//! ==============================================================================
//! producer.rs - simulated sensor node
//! ==============================================================================
//!
//! purpose:
//!     pushes synthetic readings to a relay so the whole chain can be watched
//!     without hardware attached.
//!
//! signal plan (per step n):
//!     accelerometer       every step
//!     metallic presence   every 2nd step
//!     magnetometer        every 3rd step
//!     ultrasonic          every step, sweeping 1.4 m .. 2.6 m
//!
//! ==============================================================================

use crate::config::ProducerConfig;
use crate::domain::{Accelerometer, Magnetometer, TelemetryReading, Ultrasonic};
use crate::error::Result;
use crate::server::ACK;

use std::future::Future;
use std::time::Duration;

/// reading number `step` of the synthetic signal plan
pub fn synthetic_reading(step: u64) -> TelemetryReading {
    let t = step as f64 * 0.2;

    let metallic_presence = (step % 2 == 0).then(|| Some((t.sin().abs() * 100.0).round() / 100.0));
    let magnetometer = (step % 3 == 0).then(|| Magnetometer {
        mx: Some(25.0 * t.cos()),
        my: Some(25.0 * t.sin()),
        mz: Some(-40.0),
    });

    TelemetryReading {
        accelerometer: Some(Accelerometer {
            ax: Some(0.5 * t.sin()),
            ay: Some(0.5 * t.cos()),
            az: Some(9.81 + 0.05 * (3.0 * t).sin()),
        }),
        metallic_presence,
        magnetometer,
        ultrasonic: Some(Ultrasonic { distance: Some(2.0 + 0.6 * (t / 2.0).sin()) }),
    }
}

/// Post readings until `config.count` is reached or `shutdown` fires.
///
/// Returns how many readings the relay acknowledged.
pub async fn run<F>(config: &ProducerConfig, show_data: bool, shutdown: F) -> Result<u64>
where
    F: Future<Output = ()>,
{
    let client = reqwest::Client::new();
    let url = format!("{}/receive-data", config.relay_url.trim_end_matches('/'));
    let mut ticker = tokio::time::interval(Duration::from_millis(config.interval_ms));
    tokio::pin!(shutdown);

    tracing::info!(%url, interval_ms = config.interval_ms, "producing readings");

    let mut step = 0u64;
    let mut acked = 0u64;
    while config.count.map_or(true, |count| step < count) {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let reading = synthetic_reading(step);
        step += 1;

        match post(&client, &url, &reading).await {
            Ok(()) => {
                acked += 1;
                if show_data {
                    tracing::info!(step, reading = ?reading, "sent");
                }
            }
            Err(e) => tracing::warn!(step, error = %e, "post failed"),
        }
    }

    tracing::info!(sent = step, acked, "producer stopped");
    Ok(acked)
}

async fn post(client: &reqwest::Client, url: &str, reading: &TelemetryReading) -> Result<()> {
    let body = client
        .post(url)
        .json(reading)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    if body != ACK {
        tracing::debug!(%body, "unexpected acknowledgement");
    }
    Ok(())
}
