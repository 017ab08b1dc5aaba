//! ==============================================================================
//! dashboard - live chart model for one dashboard session
//! ==============================================================================
//!
//! purpose:
//!     turns frames from the relay into four time-series charts, fills silent
//!     periods with gap points and tracks the ultrasonic height alert.
//!
//! relationships:
//!     - used by: client.rs (terminal dashboard session)
//!     - used by: server.rs (/api/charts layout for the browser dashboard)
//!     - uses: domain.rs (TelemetryReading)
//!
//! charts:
//!     accelerometerChart     line, X/Y/Z
//!     metallicPresenceChart  bar, single series
//!     magnetometerChart      line, field magnitude
//!     uvSensorChart          line, ultrasonic distance
//!
//! ==============================================================================

pub mod alert;
pub mod chart;
pub mod watchdog;

pub use alert::{Alert, AlertRule};
pub use chart::{tick_label, tooltip_label, Chart, ChartKind, ChartSeries, Point};
pub use watchdog::GapWatchdog;

use crate::config::DashboardConfig;
use crate::domain::TelemetryReading;
use chrono::{DateTime, Local};
use serde_json::json;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartId {
    Accelerometer,
    MetallicPresence,
    Magnetometer,
    Ultrasonic,
}

impl ChartId {
    pub const ALL: [ChartId; 4] = [
        ChartId::Accelerometer,
        ChartId::MetallicPresence,
        ChartId::Magnetometer,
        ChartId::Ultrasonic,
    ];
}

/// What one frame changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update {
    /// charts that received a row, in chart order
    pub charts: Vec<ChartId>,
    /// the alert after this frame, when the frame carried a distance
    pub alert: Option<Alert>,
}

pub struct Dashboard {
    accelerometer: Chart,
    metallic_presence: Chart,
    magnetometer: Chart,
    ultrasonic: Chart,
    alert_rule: AlertRule,
    alert: Alert,
    watchdog: GapWatchdog,
}

impl Dashboard {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            accelerometer: Chart::line(
                "accelerometerChart",
                "Accelerometer Data",
                &[("X", "red"), ("Y", "green"), ("Z", "blue")],
            ),
            metallic_presence: Chart::bar(
                "metallicPresenceChart",
                "Metallic Presence",
                &[("Metallic Presence", "purple")],
            ),
            magnetometer: Chart::line(
                "magnetometerChart",
                "Magnetometer Data",
                &[("Magnetometer", "orange")],
            ),
            ultrasonic: Chart::line("uvSensorChart", "UV Sensor Data", &[("UV Distance", "violet")]),
            alert_rule: AlertRule::new(config.alert_threshold_m),
            alert: Alert::Hidden,
            watchdog: GapWatchdog::new(config.watchdog_ms),
        }
    }

    /// Decode and apply one text frame received at `now`.
    ///
    /// An undecodable frame changes nothing, not even the watchdog.
    pub fn receive(&mut self, text: &str, now: DateTime<Local>) -> serde_json::Result<Update> {
        let reading = TelemetryReading::decode(text)?;
        Ok(self.apply(&reading, now))
    }

    /// Record a receipt and append a row for every signal group present.
    ///
    /// A frame without groups (the connection notice) only feeds the watchdog.
    pub fn apply(&mut self, reading: &TelemetryReading, now: DateTime<Local>) -> Update {
        self.watchdog.touch(now);
        let mut update = Update::default();

        if let Some(acc) = &reading.accelerometer {
            self.accelerometer.push_row(now, &[acc.ax, acc.ay, acc.az]);
            update.charts.push(ChartId::Accelerometer);
        }

        if let Some(level) = reading.metallic_presence {
            self.metallic_presence.push_row(now, &[level]);
            update.charts.push(ChartId::MetallicPresence);
        }

        if let Some(mag) = &reading.magnetometer {
            self.magnetometer.push_row(now, &[mag.magnitude()]);
            update.charts.push(ChartId::Magnetometer);
        }

        if let Some(us) = &reading.ultrasonic {
            self.ultrasonic.push_row(now, &[us.distance]);
            update.charts.push(ChartId::Ultrasonic);

            if let Some(distance) = us.distance {
                self.alert = self.alert_rule.evaluate(distance);
                update.alert = Some(self.alert.clone());
            }
        }

        update
    }

    /// Watchdog tick: after a silent period append one gap row to every chart.
    ///
    /// Returns whether gaps were added.
    pub fn tick(&mut self, now: DateTime<Local>) -> bool {
        if !self.watchdog.is_silent(now) {
            return false;
        }
        for id in ChartId::ALL {
            self.chart_mut(id).push_placeholder(now);
        }
        true
    }

    pub fn chart(&self, id: ChartId) -> &Chart {
        match id {
            ChartId::Accelerometer => &self.accelerometer,
            ChartId::MetallicPresence => &self.metallic_presence,
            ChartId::Magnetometer => &self.magnetometer,
            ChartId::Ultrasonic => &self.ultrasonic,
        }
    }

    fn chart_mut(&mut self, id: ChartId) -> &mut Chart {
        match id {
            ChartId::Accelerometer => &mut self.accelerometer,
            ChartId::MetallicPresence => &mut self.metallic_presence,
            ChartId::Magnetometer => &mut self.magnetometer,
            ChartId::Ultrasonic => &mut self.ultrasonic,
        }
    }

    pub fn charts(&self) -> impl Iterator<Item = &Chart> {
        ChartId::ALL.into_iter().map(move |id| self.chart(id))
    }

    pub fn alert(&self) -> &Alert {
        &self.alert
    }

    pub fn last_receipt(&self) -> Option<DateTime<Local>> {
        self.watchdog.last_receipt()
    }

    /// Layout document the browser dashboard builds its charts from.
    pub fn layout(config: &DashboardConfig) -> serde_json::Value {
        let dashboard = Self::new(config);
        let charts: Vec<_> = dashboard.charts().map(Chart::layout).collect();
        json!({
            "charts": charts,
            "watchdogMs": config.watchdog_ms,
            "alertThresholdM": config.alert_threshold_m,
            "placeholderStroke": chart::PLACEHOLDER_STROKE,
        })
    }
}
