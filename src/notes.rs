//! Observation notes: facts about today's score distribution.
//!
//! Notes are independent of the total score and carry no recommendation;
//! a note either applies today or it does not.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aggregate::DailySummary;
use crate::config::NoteThresholds;
use crate::history::HistoryWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObservationNote {
    /// Few withheld scores and a sizeable share of strong ones.
    MaterialsEmerging,
    /// Mostly withheld scores, several days running.
    NoiseDominant,
    /// Strong scores concentrated on one side.
    OneSided,
    /// Attention on rates, FX and macro data.
    MacroFocus,
}

impl ObservationNote {
    pub fn message(self) -> &'static str {
        match self {
            ObservationNote::MaterialsEmerging => {
                "The market may be starting to react to material it can evaluate."
            }
            ObservationNote::NoiseDominant => {
                "News that is hard to use for judgement has dominated for several days."
            }
            ObservationNote::OneSided => "The reading of the news appears skewed to one side.",
            ObservationNote::MacroFocus => {
                "Attention on preconditions other than equities (rates, FX) is rising."
            }
        }
    }
}

impl fmt::Display for ObservationNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObservationNote::MaterialsEmerging => "materials-emerging",
            ObservationNote::NoiseDominant => "noise-dominant",
            ObservationNote::OneSided => "one-sided",
            ObservationNote::MacroFocus => "macro-focus",
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NoteDetector {
    thresholds: NoteThresholds,
}

impl NoteDetector {
    pub fn new(thresholds: NoteThresholds) -> Self {
        Self { thresholds }
    }

    /// Consecutive days before today, newest first, above the noise threshold.
    pub fn high_zero_streak(&self, history: &HistoryWindow) -> usize {
        history
            .iter()
            .rev()
            .take_while(|d| d.has_data() && d.zero_ratio > self.thresholds.noise_zero_above)
            .count()
    }

    pub fn detect(&self, today: &DailySummary, history: &HistoryWindow) -> Vec<ObservationNote> {
        let t = &self.thresholds;
        let mut notes = Vec::new();
        if !today.has_data() {
            return notes;
        }

        if today.zero_ratio < t.emerging_zero_below
            && (today.plus2_ratio > t.emerging_strong_above
                || today.minus2_ratio > t.emerging_strong_above)
        {
            notes.push(ObservationNote::MaterialsEmerging);
        }
        if today.zero_ratio > t.noise_zero_above && self.high_zero_streak(history) >= t.noise_min_days
        {
            notes.push(ObservationNote::NoiseDominant);
        }
        if today.plus2_ratio > t.one_sided_above || today.minus2_ratio > t.one_sided_above {
            notes.push(ObservationNote::OneSided);
        }
        if today.macro_ratio > t.macro_focus_above {
            notes.push(ObservationNote::MacroFocus);
        }
        notes
    }
}
