use chrono::{DateTime, Local, TimeDelta};

/// Tracks the last frame receipt and reports silent periods.
///
/// Filling a gap does not count as a receipt, so every silent tick
/// reports silence again.
pub struct GapWatchdog {
    last_receipt: Option<DateTime<Local>>,
    gap: TimeDelta,
}

impl GapWatchdog {
    /// `gap_ms` beyond what a `TimeDelta` can hold saturates to `TimeDelta::MAX`.
    pub fn new(gap_ms: u64) -> Self {
        let gap = i64::try_from(gap_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX);
        Self { last_receipt: None, gap }
    }

    pub fn touch(&mut self, now: DateTime<Local>) {
        self.last_receipt = Some(now);
    }

    pub fn last_receipt(&self) -> Option<DateTime<Local>> {
        self.last_receipt
    }

    /// true once at least `gap` has passed since the last receipt;
    /// never true before the first receipt
    pub fn is_silent(&self, now: DateTime<Local>) -> bool {
        match self.last_receipt {
            Some(last) => now.signed_duration_since(last) >= self.gap,
            None => false,
        }
    }
}
