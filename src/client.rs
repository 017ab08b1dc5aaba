//! terminal dashboard: one websocket session feeding the chart model
//!
//! frames and watchdog ticks are handled on the same task, so the
//! dashboard state needs no locking.

use crate::config::DashboardConfig;
use crate::dashboard::{tooltip_label, Alert, Dashboard, Update};
use crate::error::{RelayError, Result};

use chrono::Local;
use futures_util::StreamExt;
use reqwest::Url;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;

/// Derive the push channel address from the page origin.
///
/// `http://host:port` becomes `ws://host:port/`, `https` becomes `wss`.
pub fn websocket_url(origin: &str) -> Result<String> {
    let url = Url::parse(origin).map_err(|_| RelayError::Origin(origin.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(RelayError::Origin(origin.to_string())),
    };
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| RelayError::Origin(origin.to_string()))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}/", scheme, host, port),
        None => format!("{}://{}/", scheme, host),
    })
}

/// Run one dashboard session until the relay hangs up or `shutdown` fires.
///
/// Returns the final dashboard so callers can inspect what was drawn.
pub async fn run<F>(config: &DashboardConfig, shutdown: F) -> Result<Dashboard>
where
    F: Future<Output = ()>,
{
    let url = websocket_url(&config.origin)?;
    tracing::info!(%url, "connecting");
    let (mut stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
    tracing::info!("connected");

    let mut dashboard = Dashboard::new(config);
    let mut ticker = tokio::time::interval(Duration::from_millis(config.watchdog_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if dashboard.tick(Local::now()) {
                    tracing::debug!("no data for a watchdog period, gap added");
                }
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => on_frame(&mut dashboard, &text),
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("relay closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }

    for chart in dashboard.charts() {
        tracing::info!(chart = chart.id, points = chart.len(), "session summary");
    }
    Ok(dashboard)
}

fn on_frame(dashboard: &mut Dashboard, text: &str) {
    let was_visible = dashboard.alert().is_visible();
    match dashboard.receive(text, Local::now()) {
        Ok(update) => log_update(dashboard, &update, was_visible),
        Err(e) => tracing::debug!(error = %e, "dropping undecodable frame"),
    }
}

fn log_update(dashboard: &Dashboard, update: &Update, was_visible: bool) {
    for id in &update.charts {
        let chart = dashboard.chart(*id);
        let values: Vec<String> = chart
            .series
            .iter()
            .map(|s| tooltip_label(s.label, s.last().and_then(|p| p.y)))
            .collect();
        tracing::info!(chart = chart.id, values = %values.join(", "), "update");
    }

    match &update.alert {
        Some(Alert::Visible(message)) => tracing::warn!("{}", message),
        Some(Alert::Hidden) if was_visible => tracing::info!("height back within limit"),
        _ => {}
    }
}
