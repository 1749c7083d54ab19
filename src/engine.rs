//! # Daily Engine
//! Pure pipeline from a raw batch to a `DailyReport`:
//! intake → classify → score → aggregate → alerts/notes/remarks → report.
//!
//! No I/O. The caller supplies the history window and decides whether to
//! persist the resulting summary.

use chrono::{NaiveDate, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::aggregate::Aggregator;
use crate::alerts::AlertDetector;
use crate::analyze::{group_by_speaker, Classifier, RemarkDetector, ScoredArticle, Scorer};
use crate::config::{KeywordTables, ObserverConfig};
use crate::history::{HistoryComparison, HistoryWindow};
use crate::ingest::types::{Article, RawArticle};
use crate::ingest::{prepare_batch, Intake};
use crate::notes::NoteDetector;
use crate::report::{self, DailyReport, IntakeStats, NoteEntry, PartitionedNews};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("observer_alerts_total", "Alerts raised, labelled by kind.");
        describe_gauge!("observer_last_total_score", "Mean impact score of the last run.");
        describe_gauge!("observer_last_run_ts", "Unix time of the last completed run.");
    });
}

#[derive(Debug, Clone)]
pub struct Engine {
    classifier: Classifier,
    scorer: Scorer,
    aggregator: Aggregator,
    alerts: AlertDetector,
    notes: NoteDetector,
    remarks: RemarkDetector,
}

impl Engine {
    pub fn new(tables: Arc<KeywordTables>, config: &ObserverConfig) -> Self {
        Self {
            classifier: Classifier::new(tables.clone()),
            scorer: Scorer::new(tables.clone()),
            aggregator: Aggregator::new(tables.clone(), config.aggregate.representative_cap),
            remarks: RemarkDetector::new(tables),
            alerts: AlertDetector::new(config.alerts),
            notes: NoteDetector::new(config.notes),
        }
    }

    /// Classify and score, preserving input order.
    pub fn score_articles(&self, articles: &[Article]) -> Vec<ScoredArticle> {
        articles
            .iter()
            .map(|a| {
                let c = self.classifier.classify(a);
                self.scorer.score(a, &c)
            })
            .collect()
    }

    /// Full run over a raw batch.
    pub fn run(&self, date: NaiveDate, raw: Vec<RawArticle>, history: &HistoryWindow) -> DailyReport {
        self.run_intake(date, prepare_batch(raw), history)
    }

    /// Run over an already prepared batch. Entries for `date` itself are
    /// ignored in `history`, so re-running a day compares against the days before.
    pub fn run_intake(&self, date: NaiveDate, intake: Intake, history: &HistoryWindow) -> DailyReport {
        ensure_metrics_described();

        let history = history.preceding(date);
        let scored = self.score_articles(&intake.accepted);
        let aggregate = self.aggregator.aggregate(date, &scored);
        let summary = aggregate.summary.clone();
        let has_priority = aggregate.has_priority();

        let alerts = self.alerts.detect(&summary, &history);
        for a in &alerts {
            counter!("observer_alerts_total", "kind" => a.kind.as_str()).increment(1);
        }
        let notes = self.notes.detect(&summary, &history);
        let comparison = HistoryComparison::between(&summary, &history);
        let withheld = report::withheld_counts(&scored);
        let remarks = self.remarks.detect(&scored);

        gauge!("observer_last_total_score").set(summary.total_score);
        gauge!("observer_last_run_ts").set(Utc::now().timestamp() as f64);

        tracing::info!(
            target: "engine",
            %date,
            articles = summary.news_count,
            rejected = intake.rejected.len(),
            duplicates = intake.duplicates,
            total = summary.total_score,
            zero_ratio = summary.zero_ratio,
            alerts = alerts.len(),
            remarks = remarks.len(),
            history = history.len(),
            "daily run complete"
        );

        DailyReport {
            date,
            generated_at: Utc::now(),
            one_liner: report::one_liner(&summary, has_priority),
            outlook: report::outlook(&summary, has_priority),
            has_priority,
            priority_topics: aggregate.priority,
            news: PartitionedNews::from_scored(scored),
            alerts,
            market_remarks: group_by_speaker(remarks),
            notes: notes.into_iter().map(NoteEntry::from).collect(),
            comparison,
            intake: IntakeStats::from(&intake),
            withheld_summary: report::withheld_summary(&withheld),
            withheld,
            summary,
        }
    }
}
