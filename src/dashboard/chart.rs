//! chart data model and the Chart.js layout it is rendered with

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::json;

/// stroke used for watchdog placeholders so gaps read as "no data"
pub const PLACEHOLDER_STROKE: &str = "rgba(0, 0, 0, 0.1)";

/// x axis tick format (Chart.js / date-fns tokens)
pub const TICK_FORMAT: &str = "HH:mm:ss";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

/// one plotted sample; `y == None` is a gap
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: DateTime<Local>,
    pub y: Option<f64>,
    #[serde(rename = "borderColor", skip_serializing_if = "Option::is_none")]
    pub border_color: Option<&'static str>,
}

impl Point {
    pub fn new(x: DateTime<Local>, y: Option<f64>) -> Self {
        let border_color = if y.is_none() { Some(PLACEHOLDER_STROKE) } else { None };
        Self { x, y, border_color }
    }

    pub fn is_placeholder(&self) -> bool {
        self.y.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: &'static str,
    pub color: &'static str,
    pub points: Vec<Point>,
}

impl ChartSeries {
    fn new(label: &'static str, color: &'static str) -> Self {
        Self { label, color, points: Vec::new() }
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Chart {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: ChartKind,
    pub labels: Vec<DateTime<Local>>,
    pub series: Vec<ChartSeries>,
}

impl Chart {
    pub fn line(id: &'static str, title: &'static str, series: &[(&'static str, &'static str)]) -> Self {
        Self::with_kind(ChartKind::Line, id, title, series)
    }

    pub fn bar(id: &'static str, title: &'static str, series: &[(&'static str, &'static str)]) -> Self {
        Self::with_kind(ChartKind::Bar, id, title, series)
    }

    fn with_kind(
        kind: ChartKind,
        id: &'static str,
        title: &'static str,
        series: &[(&'static str, &'static str)],
    ) -> Self {
        Self {
            id,
            title,
            kind,
            labels: Vec::new(),
            series: series.iter().map(|&(label, color)| ChartSeries::new(label, color)).collect(),
        }
    }

    /// Append one row: a label at `at` and one point per series.
    ///
    /// Series without a matching entry in `values` get a gap. Timestamps
    /// never go backwards; an earlier `at` is clamped to the last label.
    pub fn push_row(&mut self, at: DateTime<Local>, values: &[Option<f64>]) {
        let at = match self.labels.last() {
            Some(last) if *last > at => *last,
            _ => at,
        };
        self.labels.push(at);
        for (i, series) in self.series.iter_mut().enumerate() {
            let y = values.get(i).copied().flatten();
            series.points.push(Point::new(at, y));
        }
    }

    /// Append a gap row to every series.
    pub fn push_placeholder(&mut self, at: DateTime<Local>) {
        self.push_row(at, &[]);
    }

    /// number of rows appended so far
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Chart.js configuration for this chart, without data points.
    pub fn layout(&self) -> serde_json::Value {
        let datasets: Vec<_> = self
            .series
            .iter()
            .map(|s| match self.kind {
                ChartKind::Line => json!({
                    "label": s.label,
                    "data": [],
                    "borderColor": s.color,
                    "fill": false,
                    "borderWidth": 2,
                }),
                ChartKind::Bar => json!({
                    "label": s.label,
                    "data": [],
                    "backgroundColor": s.color,
                }),
            })
            .collect();

        json!({
            "id": self.id,
            "type": self.kind,
            "data": { "labels": [], "datasets": datasets },
            "options": {
                "responsive": true,
                "maintainAspectRatio": false,
                "scales": {
                    "x": {
                        "type": "time",
                        "time": {
                            "unit": "second",
                            "displayFormats": { "second": TICK_FORMAT },
                        },
                        "ticks": { "autoSkip": false, "maxRotation": 0, "minRotation": 0 },
                    },
                    "y": { "beginAtZero": true },
                },
                "plugins": {
                    "title": { "display": true, "text": self.title },
                },
            },
        })
    }
}

/// tooltip text for one point
pub fn tooltip_label(label: &str, value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}: {:.2}", label, v),
        None => format!("{}: No Data", label),
    }
}

/// x axis tick text for a timestamp
pub fn tick_label(at: &DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}
