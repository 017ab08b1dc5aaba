/// Visible state of the ultrasonic height alert.
#[derive(Clone, Debug, PartialEq)]
pub enum Alert {
    Hidden,
    Visible(String),
}

impl Alert {
    pub fn is_visible(&self) -> bool {
        matches!(self, Alert::Visible(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Alert::Visible(message) => Some(message),
            Alert::Hidden => None,
        }
    }
}

/// Shows the alert whenever a distance strictly exceeds the threshold.
///
/// Every reading is judged on its own; there is no hysteresis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlertRule {
    threshold_m: f64,
}

impl AlertRule {
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m }
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    pub fn evaluate(&self, distance: f64) -> Alert {
        if distance > self.threshold_m {
            Alert::Visible(format!(
                "Alert: Height exceeds {} meters! Current height: {:.2} meters.",
                self.threshold_m, distance
            ))
        } else {
            Alert::Hidden
        }
    }
}

impl Default for AlertRule {
    fn default() -> Self {
        Self::new(2.0)
    }
}
