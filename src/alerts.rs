//! Day-over-day and regional change alerts.
//!
//! Three independent rules over today's summary and the trailing window:
//! - score swing vs yesterday
//! - sign flip of the trailing moving average
//! - domestic/foreign divergence
//!
//! Alerts describe what changed. They never suggest an action.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aggregate::DailySummary;
use crate::config::AlertThresholds;
use crate::history::HistoryWindow;

/// Tolerance for threshold comparisons so an exact boundary fires.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    ScoreSwing,
    MovingAverageReversal,
    DomesticForeignDivergence,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::ScoreSwing => "score-swing",
            AlertKind::MovingAverageReversal => "moving-average-reversal",
            AlertKind::DomesticForeignDivergence => "domestic-foreign-divergence",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    /// Signed size of the change (delta, new average, or domestic − foreign gap).
    pub magnitude: f64,
}

fn at_least(value: f64, threshold: f64) -> bool {
    value + EPSILON >= threshold
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlertDetector {
    thresholds: AlertThresholds,
}

impl AlertDetector {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// `history` must not contain `today` itself; its last entry is yesterday.
    pub fn detect(&self, today: &DailySummary, history: &HistoryWindow) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if today.has_data() {
            alerts.extend(self.score_swing(today, history));
            alerts.extend(self.ma_reversal(history));
        } else {
            tracing::debug!(target: "engine", date = %today.date, "no data today, history rules skipped");
        }
        alerts.extend(self.divergence(today));
        alerts
    }

    fn score_swing(&self, today: &DailySummary, history: &HistoryWindow) -> Option<Alert> {
        let yesterday = history.latest()?;
        let delta = today.total_score - yesterday.total_score;
        if !at_least(delta.abs(), self.thresholds.swing) {
            return None;
        }
        let severity = if at_least(delta.abs(), self.thresholds.swing_warning) {
            Severity::Warning
        } else {
            Severity::Info
        };
        let trend = if delta > 0.0 { "upward" } else { "downward" };
        Some(Alert {
            kind: AlertKind::ScoreSwing,
            severity,
            message: format!(
                "Total score moved {delta:+.1} vs {} ({trend} shift)",
                yesterday.date
            ),
            magnitude: delta,
        })
    }

    fn ma_reversal(&self, history: &HistoryWindow) -> Option<Alert> {
        let w = self.thresholds.ma_window;
        if history.len() < w + 1 {
            return None;
        }
        let totals = history.trailing_totals(w + 1);
        let prev_ma = totals[..w].iter().sum::<f64>() / w as f64;
        let ma = totals[1..].iter().sum::<f64>() / w as f64;

        let (severity, message) = match (sign(prev_ma), sign(ma)) {
            (-1, 1) => (
                Severity::Info,
                format!("{w}-day moving average turned positive ({prev_ma:+.2} → {ma:+.2})"),
            ),
            (1, -1) => (
                Severity::Warning,
                format!("{w}-day moving average turned negative ({prev_ma:+.2} → {ma:+.2})"),
            ),
            _ => return None,
        };
        Some(Alert {
            kind: AlertKind::MovingAverageReversal,
            severity,
            message,
            magnitude: ma,
        })
    }

    fn divergence(&self, today: &DailySummary) -> Option<Alert> {
        let gap = today.domestic_score - today.foreign_score;
        if !at_least(gap.abs(), self.thresholds.divergence) {
            return None;
        }
        let (severity, message) = if gap > 0.0 {
            (
                Severity::Info,
                format!("Domestic score is {gap:+.1} above foreign (domestic tone more upbeat)"),
            )
        } else {
            (
                Severity::Warning,
                format!("Domestic score is {:.1} below foreign (domestic tone more cautious)", gap.abs()),
            )
        };
        Some(Alert {
            kind: AlertKind::DomesticForeignDivergence,
            severity,
            message,
            magnitude: gap,
        })
    }
}
