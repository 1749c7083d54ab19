// tests/score_bounds.rs
//
// Randomised (seeded) headlines assembled from the shipped vocabulary:
// every score stays in [-10, 10], every confidence in [0, 5], and a
// non-zero score always cites at least one factor.

use std::sync::Arc;

use chrono::NaiveDate;
use market_observer::analyze::ScoreReason;
use market_observer::config::{KeywordTables, ObserverConfig};
use market_observer::history::HistoryWindow;
use market_observer::ingest::types::RawArticle;
use market_observer::Engine;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FILLER: &[&str] = &["the", "amid", "after", "report", "says", "on", "and", "while"];

fn vocabulary(t: &KeywordTables) -> Vec<String> {
    let mut v: Vec<String> = t.direction.iter().map(|d| d.keyword.raw.clone()).collect();
    v.extend(t.hedges.iter().map(|k| k.raw.clone()));
    for tier in &t.intensity {
        v.extend(tier.keywords.iter().map(|k| k.raw.clone()));
    }
    for tier in &t.breadth {
        v.extend(tier.keywords.iter().map(|k| k.raw.clone()));
    }
    for c in &t.categories {
        v.extend(c.keywords.iter().map(|k| k.raw.clone()));
    }
    v.extend(FILLER.iter().map(|s| s.to_string()));
    v
}

#[test]
fn random_headlines_stay_in_bounds() {
    let tables = KeywordTables::builtin().expect("builtin tables");
    let vocab = vocabulary(&tables);
    let engine = Engine::new(Arc::new(tables), &ObserverConfig::default());
    let mut rng = StdRng::seed_from_u64(0x5eed);

    let mut batch = Vec::new();
    for i in 0..400 {
        let words = rng.random_range(1..=14);
        let title: Vec<&str> = (0..words)
            .map(|_| vocab[rng.random_range(0..vocab.len())].as_str())
            .collect();
        batch.push(RawArticle {
            title: format!("{} #{i}", title.join(" ")),
            source: "wire".into(),
            published_at: Some("2025-03-10T00:00:00Z".into()),
            ..Default::default()
        });
    }

    let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let report = engine.run(date, batch, &HistoryWindow::with_capacity(7));
    assert_eq!(report.news.len(), 400);

    for a in report
        .news
        .positive
        .iter()
        .chain(report.news.negative.iter())
        .chain(report.news.neutral.iter())
    {
        let s = &a.scored;
        assert!((-10..=10).contains(&s.impact_score.get()), "{:?}", s.impact_score);
        assert!(s.confidence.get() <= 5);
        if !s.impact_score.is_zero() {
            assert!(matches!(s.score_reason, ScoreReason::Directional { .. }));
            assert!(!s.positive_factors.is_empty() || !s.negative_factors.is_empty());
        } else if s.positive_factors.is_empty() && s.negative_factors.is_empty() {
            assert!(s.is_withheld());
        }
    }

    let sum = &report.summary;
    assert!(sum.total_score >= -10.0 && sum.total_score <= 10.0);
    assert!((0.0..=100.0).contains(&sum.zero_ratio));
}
