//! Daily report: the JSON contract consumed by the dashboard.
//!
//! Everything here is packaging. Scores, alerts and notes are computed
//! elsewhere; this module partitions, counts and picks templated phrasing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::aggregate::{DailySummary, PriorityTopic, PriorityTopicBreakdown};
use crate::alerts::Alert;
use crate::analyze::{ScoredArticle, SpeakerRemarks, WithheldReason};
use crate::history::HistoryComparison;
use crate::ingest::{Intake, Rejection};
use crate::notes::ObservationNote;

#[derive(Debug, Clone, Serialize)]
pub struct ReportArticle {
    #[serde(flatten)]
    pub scored: ScoredArticle,
    /// Rendered `score_reason`.
    pub reason_text: String,
}

impl From<ScoredArticle> for ReportArticle {
    fn from(scored: ScoredArticle) -> Self {
        let reason_text = scored.score_reason.to_string();
        Self {
            scored,
            reason_text,
        }
    }
}

/// Scored articles split by sign, strongest first within each side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartitionedNews {
    pub positive: Vec<ReportArticle>,
    pub negative: Vec<ReportArticle>,
    pub neutral: Vec<ReportArticle>,
}

impl PartitionedNews {
    pub fn from_scored(scored: Vec<ScoredArticle>) -> Self {
        let mut out = PartitionedNews::default();
        for s in scored {
            let v = s.impact_score.get();
            let bucket = if v > 0 {
                &mut out.positive
            } else if v < 0 {
                &mut out.negative
            } else {
                &mut out.neutral
            };
            bucket.push(ReportArticle::from(s));
        }
        out.positive
            .sort_by_key(|a| std::cmp::Reverse(a.scored.impact_score));
        out.negative.sort_by_key(|a| a.scored.impact_score);
        out
    }

    pub fn len(&self) -> usize {
        self.positive.len() + self.negative.len() + self.neutral.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntakeStats {
    pub received: usize,
    pub accepted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejections: Vec<Rejection>,
}

impl From<&Intake> for IntakeStats {
    fn from(i: &Intake) -> Self {
        Self {
            received: i.received,
            accepted: i.accepted.len(),
            duplicates: i.duplicates,
            rejected: i.rejected.len(),
            rejections: i.rejected.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteEntry {
    pub note: ObservationNote,
    pub message: &'static str,
}

impl From<ObservationNote> for NoteEntry {
    fn from(note: ObservationNote) -> Self {
        Self {
            note,
            message: note.message(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub summary: DailySummary,
    pub one_liner: String,
    pub outlook: Vec<String>,
    pub has_priority: bool,
    /// Keyed by topic name.
    pub priority_topics: BTreeMap<PriorityTopic, PriorityTopicBreakdown>,
    pub news: PartitionedNews,
    pub alerts: Vec<Alert>,
    /// Remarks by tracked speakers, grouped per speaker.
    pub market_remarks: Vec<SpeakerRemarks>,
    pub notes: Vec<NoteEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<HistoryComparison>,
    pub intake: IntakeStats,
    /// Count of withheld evaluations per reason.
    pub withheld: BTreeMap<WithheldReason, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withheld_summary: Option<String>,
}

/// One-sentence characterisation of the day.
pub fn one_liner(summary: &DailySummary, has_priority: bool) -> String {
    let z = summary.zero_ratio;
    let text = if !summary.has_data() {
        "No usable articles today; nothing to characterise."
    } else if has_priority {
        if z >= 50.0 {
            "Important macro news is out, but overall there is little to judge by today."
        } else {
            "Today has plenty of material to judge by; check the priority topics."
        }
    } else if z >= 70.0 {
        "Little material to judge by today; direction is hard to read."
    } else if z >= 50.0 {
        "Few clear-cut stories today."
    } else if summary.total_score >= 3.0 {
        "Positive news stands out today."
    } else if summary.total_score <= -3.0 {
        "Worrying news stands out today."
    } else {
        "No major moves today."
    };
    text.to_string()
}

/// Two templated lines on what could happen next. Never a recommendation.
pub fn outlook(summary: &DailySummary, has_priority: bool) -> Vec<String> {
    let lines: [&str; 2] = if has_priority {
        [
            "Moves in line with the important news are possible.",
            "Other factors could still offset them.",
        ]
    } else if summary.news_count > 0 && summary.zero_count * 2 > summary.news_count {
        [
            "Quiet conditions may continue until clearer news arrives.",
            "Fresh news could make the direction visible.",
        ]
    } else {
        [
            "Waiting for new information may continue.",
            "A major story could set the direction.",
        ]
    };
    lines.iter().map(|s| s.to_string()).collect()
}

pub fn withheld_counts(scored: &[ScoredArticle]) -> BTreeMap<WithheldReason, usize> {
    let mut out = BTreeMap::new();
    for r in scored.iter().filter_map(ScoredArticle::withheld) {
        *out.entry(r).or_insert(0) += 1;
    }
    out
}

/// Phrase for the dominant withholding reason, if any article was withheld.
pub fn withheld_summary(counts: &BTreeMap<WithheldReason, usize>) -> Option<String> {
    // first in enum order wins a tie
    let (top, _) = counts
        .iter()
        .fold(None::<(WithheldReason, usize)>, |best, (&r, &n)| match best {
            Some((_, b)) if b >= n => best,
            _ => Some((r, n)),
        })?;
    let text = match top {
        WithheldReason::NoKeywordMatch => {
            "Most withheld stories carried no market-moving wording."
        }
        WithheldReason::ConflictingSignalsCancelled => {
            "Most withheld stories mixed positive and negative signals."
        }
        WithheldReason::CategoryNotScorable => {
            "Most withheld stories fell outside the scored categories."
        }
    };
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(total: f64, zero_ratio: f64, news: usize) -> DailySummary {
        let mut s = DailySummary::empty(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        if news > 0 {
            s.no_data.clear();
        }
        s.total_score = total;
        s.zero_ratio = zero_ratio;
        s.news_count = news;
        s.zero_count = (zero_ratio / 100.0 * news as f64).round() as usize;
        s
    }

    #[test]
    fn one_liner_templates() {
        assert_eq!(one_liner(&summary(0.0, 0.0, 0), false), "No usable articles today; nothing to characterise.");
        assert_eq!(one_liner(&summary(0.0, 60.0, 10), true), "Important macro news is out, but overall there is little to judge by today.");
        assert_eq!(one_liner(&summary(0.0, 20.0, 10), true), "Today has plenty of material to judge by; check the priority topics.");
        assert_eq!(one_liner(&summary(5.0, 75.0, 10), false), "Little material to judge by today; direction is hard to read.");
        assert_eq!(one_liner(&summary(5.0, 55.0, 10), false), "Few clear-cut stories today.");
        assert_eq!(one_liner(&summary(3.0, 10.0, 10), false), "Positive news stands out today.");
        assert_eq!(one_liner(&summary(-3.0, 10.0, 10), false), "Worrying news stands out today.");
        assert_eq!(one_liner(&summary(1.0, 10.0, 10), false), "No major moves today.");
    }

    #[test]
    fn outlook_is_two_lines() {
        assert_eq!(outlook(&summary(0.0, 80.0, 10), false).len(), 2);
        assert!(outlook(&summary(0.0, 80.0, 10), false)[0].starts_with("Quiet"));
        assert!(outlook(&summary(0.0, 80.0, 10), true)[0].starts_with("Moves"));
        assert!(outlook(&summary(0.0, 0.0, 0), false)[0].starts_with("Waiting"));
    }

    #[test]
    fn withheld_summary_picks_most_common() {
        let mut c = BTreeMap::new();
        assert_eq!(withheld_summary(&c), None);
        c.insert(WithheldReason::NoKeywordMatch, 1);
        c.insert(WithheldReason::CategoryNotScorable, 3);
        assert_eq!(
            withheld_summary(&c).as_deref(),
            Some("Most withheld stories fell outside the scored categories.")
        );
        c.insert(WithheldReason::NoKeywordMatch, 3);
        assert_eq!(
            withheld_summary(&c).as_deref(),
            Some("Most withheld stories carried no market-moving wording.")
        );
    }
}
