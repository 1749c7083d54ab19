// tests/pipeline.rs
//
// End-to-end behaviour of the engine with the shipped keyword tables:
// classification totality, scoring determinism, aggregation edge cases,
// and the alert scenarios.

use std::sync::Arc;

use chrono::NaiveDate;
use market_observer::aggregate::{DailySummary, ScoreSubset};
use market_observer::alerts::{AlertDetector, AlertKind, Severity};
use market_observer::analyze::{Category, Region, WithheldReason};
use market_observer::config::{AlertThresholds, KeywordTables, ObserverConfig};
use market_observer::history::HistoryWindow;
use market_observer::ingest::types::RawArticle;
use market_observer::Engine;

fn engine() -> Engine {
    let tables = Arc::new(KeywordTables::builtin().expect("builtin tables"));
    Engine::new(tables, &ObserverConfig::default())
}

fn raw(title: &str, source: &str) -> RawArticle {
    RawArticle {
        title: title.to_string(),
        source: source.to_string(),
        published_at: Some("2025-03-10T06:00:00Z".to_string()),
        ..Default::default()
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn summary(d: u32, total: f64) -> DailySummary {
    let mut s = DailySummary::empty(day(d));
    s.total_score = total;
    s.news_count = 5;
    s.no_data.clear();
    s
}

#[test]
fn rate_cut_scenario_scores_six_in_monetary_policy() {
    let r = engine().run(
        day(10),
        vec![raw("Central bank signals rate cut amid slowing growth", "wire")],
        &HistoryWindow::with_capacity(7),
    );
    let a = &r.news.positive[0];
    assert_eq!(a.scored.impact_score.get(), 6);
    assert_eq!(a.scored.classification.category, Category::MonetaryPolicy);
    assert_eq!(
        a.scored.classification.sub_category.as_deref(),
        Some("rate-decision")
    );
    assert!(a.reason_text.contains("rate cut"));
    assert_eq!(r.summary.total_score, 6.0);
}

#[test]
fn every_article_gets_exactly_one_category() {
    let e = engine();
    let texts = [
        "Nikkei closes at record high as yen weakens",
        "Payrolls beat expectations, unemployment falls",
        "CPI rises faster than forecast",
        "Sanctions widen after border conflict",
        "Company posts quarterly earnings",
        "Local bakery opens second branch",
        "",
    ];
    for t in texts {
        let r = e.run(day(10), vec![raw(t, "wire"), raw("filler", "wire")], &HistoryWindow::with_capacity(7));
        let all: Vec<_> = r
            .news
            .positive
            .iter()
            .chain(r.news.negative.iter())
            .chain(r.news.neutral.iter())
            .collect();
        // the empty title is rejected at intake, so only "filler" remains then
        assert!(!all.is_empty());
        for a in all {
            assert!(Category::ALL.contains(&a.scored.classification.category));
        }
    }
}

#[test]
fn unmatched_article_is_other_and_withheld() {
    let r = engine().run(
        day(10),
        vec![raw("Local bakery opens second branch", "wire")],
        &HistoryWindow::with_capacity(7),
    );
    let a = &r.news.neutral[0].scored;
    assert_eq!(a.classification.category, Category::Other);
    assert_eq!(a.withheld(), Some(WithheldReason::NoKeywordMatch));
    assert_eq!(r.summary.zero_ratio, 100.0);
    assert_eq!(r.withheld.get(&WithheldReason::NoKeywordMatch), Some(&1));
}

#[test]
fn scorer_is_pure() {
    let e = engine();
    let batch = || {
        vec![
            raw("Stocks rally as tariff concerns ease", "Reuters"),
            raw("BOJ keeps policy rate steady", "Nikkei"),
        ]
    };
    let a = e.run(day(10), batch(), &HistoryWindow::with_capacity(7));
    let b = e.run(day(10), batch(), &HistoryWindow::with_capacity(7));
    let scores = |r: &market_observer::DailyReport| {
        r.news
            .positive
            .iter()
            .chain(r.news.negative.iter())
            .chain(r.news.neutral.iter())
            .map(|a| {
                (
                    a.scored.article.id.clone(),
                    a.scored.impact_score,
                    a.scored.confidence,
                    a.scored.positive_factors.clone(),
                    a.scored.negative_factors.clone(),
                    a.scored.uncertainty_factors.clone(),
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(scores(&a), scores(&b));
}

#[test]
fn domestic_source_sets_region() {
    let r = engine().run(
        day(10),
        vec![raw("Stocks rally on strong exports", "Nikkei")],
        &HistoryWindow::with_capacity(7),
    );
    let a = &r.news.positive[0].scored;
    assert_eq!(a.classification.region, Region::Domestic);
    assert!(r.summary.has_subset(ScoreSubset::Domestic));
    assert!(!r.summary.has_subset(ScoreSubset::Foreign));
    assert_eq!(r.summary.foreign_score, 0.0);
}

#[test]
fn empty_day_reports_no_data_and_only_divergence_is_evaluated() {
    let history = HistoryWindow::from_summaries(7, [summary(6, 5.0), summary(7, -5.0), summary(8, -5.0), summary(9, 9.0)]);
    let r = engine().run(day(10), vec![], &history);
    assert_eq!(r.summary.news_count, 0);
    assert_eq!(r.summary.zero_ratio, 0.0);
    assert_eq!(r.summary.no_data.len(), 3);
    assert!(r.alerts.is_empty());
    assert!(r.notes.is_empty());
}

#[test]
fn swing_scenario() {
    let d = AlertDetector::new(AlertThresholds::default());
    let alerts = d.detect(&summary(10, 2.0), &HistoryWindow::from_summaries(7, [summary(9, -1.5)]));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::ScoreSwing);
    assert_eq!(alerts[0].magnitude, 3.5);
}

#[test]
fn swing_boundary() {
    let d = AlertDetector::new(AlertThresholds::default());
    let yday = HistoryWindow::from_summaries(7, [summary(9, 0.0)]);
    assert_eq!(d.detect(&summary(10, 3.0), &yday).len(), 1);
    assert_eq!(d.detect(&summary(10, -3.0), &yday).len(), 1);
    assert!(d.detect(&summary(10, 2.99), &yday).is_empty());
}

#[test]
fn reversal_requires_four_history_entries() {
    let d = AlertDetector::new(AlertThresholds::default());
    let three = HistoryWindow::from_summaries(7, [summary(7, 9.0), summary(8, -9.0), summary(9, -9.0)]);
    let alerts = d.detect(&summary(10, -9.0), &three);
    assert!(alerts.iter().all(|a| a.kind != AlertKind::MovingAverageReversal));

    let four = HistoryWindow::from_summaries(
        7,
        [summary(6, 2.0), summary(7, 2.0), summary(8, 2.0), summary(9, -9.0)],
    );
    let alerts = d.detect(&summary(10, -9.0), &four);
    let rev: Vec<_> = alerts
        .iter()
        .filter(|a| a.kind == AlertKind::MovingAverageReversal)
        .collect();
    assert_eq!(rev.len(), 1);
    assert_eq!(rev[0].severity, Severity::Warning);
}

#[test]
fn divergence_scenario() {
    let d = AlertDetector::new(AlertThresholds::default());
    let mut s = summary(10, 1.0);
    s.domestic_score = 4.0;
    s.foreign_score = -1.5;
    let alerts = d.detect(&s, &HistoryWindow::with_capacity(7));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::DomesticForeignDivergence);
    assert_eq!(alerts[0].magnitude, 5.5);
}

#[test]
fn comparison_and_swing_use_prior_days() {
    let e = engine();
    let history = HistoryWindow::from_summaries(7, [summary(8, -2.0), summary(9, -2.0)]);
    let r = e.run(
        day(10),
        vec![raw("Central bank signals rate cut amid slowing growth", "wire")],
        &history,
    );
    let c = r.comparison.as_ref().expect("comparison");
    assert_eq!(c.days, 2);
    assert_eq!(c.avg_total_score, -2.0);
    assert_eq!(c.total_score_delta, 8.0);
    let swing = r.alerts.iter().find(|a| a.kind == AlertKind::ScoreSwing).unwrap();
    assert_eq!(swing.severity, Severity::Warning);
}

#[test]
fn malformed_articles_are_counted_not_fatal() {
    let mut no_ts = raw("Stocks rally", "wire");
    no_ts.published_at = None;
    let mut bad_ts = raw("Yen slides", "wire");
    bad_ts.published_at = Some("yesterday".into());
    let r = engine().run(
        day(10),
        vec![no_ts, bad_ts, raw("Stocks rally", "wire"), raw("Stocks rally", "wire")],
        &HistoryWindow::with_capacity(7),
    );
    assert_eq!(r.intake.received, 4);
    assert_eq!(r.intake.rejected, 2);
    assert_eq!(r.intake.duplicates, 1);
    assert_eq!(r.summary.news_count, 1);
}
