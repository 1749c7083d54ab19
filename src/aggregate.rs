// src/aggregate.rs
//! Daily aggregation of scored articles.
//!
//! Produces the `DailySummary` (means and distribution ratios over all /
//! domestic / foreign articles) and the per-topic priority breakdowns.
//! An empty subset yields 0 plus a no-data marker, never a division error.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::analyze::{Region, ScoredArticle};
use crate::config::KeywordTables;
use crate::text::FoldedText;

/// The six macro themes that always get their own breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityTopic {
    CentralBank,
    Treasury,
    CurrencyPair,
    Employment,
    Inflation,
    Manufacturing,
}

impl PriorityTopic {
    pub const ALL: [PriorityTopic; 6] = [
        PriorityTopic::CentralBank,
        PriorityTopic::Treasury,
        PriorityTopic::CurrencyPair,
        PriorityTopic::Employment,
        PriorityTopic::Inflation,
        PriorityTopic::Manufacturing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityTopic::CentralBank => "central-bank",
            PriorityTopic::Treasury => "treasury",
            PriorityTopic::CurrencyPair => "currency-pair",
            PriorityTopic::Employment => "employment",
            PriorityTopic::Inflation => "inflation",
            PriorityTopic::Manufacturing => "manufacturing",
        }
    }

    /// Human label for report headings.
    pub fn label(self) -> &'static str {
        match self {
            PriorityTopic::CentralBank => "Central bank policy",
            PriorityTopic::Treasury => "Treasury / bond yields",
            PriorityTopic::CurrencyPair => "Currency pair moves",
            PriorityTopic::Employment => "Employment data",
            PriorityTopic::Inflation => "Inflation data",
            PriorityTopic::Manufacturing => "Manufacturing index data",
        }
    }
}

impl fmt::Display for PriorityTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Article subsets a mean is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSubset {
    All,
    Domestic,
    Foreign,
}

/// Numbers a day is remembered by. Means are unrounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_score: f64,
    pub domestic_score: f64,
    pub foreign_score: f64,
    pub news_count: usize,
    #[serde(default)]
    pub domestic_count: usize,
    #[serde(default)]
    pub foreign_count: usize,
    #[serde(default)]
    pub zero_count: usize,
    /// Percent of articles scored exactly 0.
    pub zero_ratio: f64,
    /// Percent with score ≥ +2.
    #[serde(default)]
    pub plus2_ratio: f64,
    /// Percent with score ≤ −2.
    #[serde(default)]
    pub minus2_ratio: f64,
    /// Percent touching at least one priority topic.
    #[serde(default)]
    pub macro_ratio: f64,
    /// Subsets that had no articles; their mean is reported as 0.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub no_data: BTreeSet<ScoreSubset>,
}

impl DailySummary {
    /// Summary for a day with no usable articles.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_score: 0.0,
            domestic_score: 0.0,
            foreign_score: 0.0,
            news_count: 0,
            domestic_count: 0,
            foreign_count: 0,
            zero_count: 0,
            zero_ratio: 0.0,
            plus2_ratio: 0.0,
            minus2_ratio: 0.0,
            macro_ratio: 0.0,
            no_data: [ScoreSubset::All, ScoreSubset::Domestic, ScoreSubset::Foreign]
                .into_iter()
                .collect(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.news_count > 0 && !self.no_data.contains(&ScoreSubset::All)
    }

    pub fn has_subset(&self, subset: ScoreSubset) -> bool {
        !self.no_data.contains(&subset)
    }
}

/// Compact view of an article for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDigest {
    pub id: String,
    pub headline: String,
    pub source: String,
    pub score: i32,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<&ScoredArticle> for ArticleDigest {
    fn from(s: &ScoredArticle) -> Self {
        Self {
            id: s.article.id.clone(),
            headline: s.article.headline(),
            source: s.article.source.clone(),
            score: s.impact_score.get(),
            published_at: s.article.published_at,
            url: s.article.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityTopicBreakdown {
    /// Heading shown on the dashboard.
    #[serde(default)]
    pub label: String,
    pub present: bool,
    pub count: usize,
    /// Mean score of member articles; 0 when absent.
    pub average_score: f64,
    pub articles: Vec<ArticleDigest>,
}

#[derive(Debug, Clone)]
pub struct Aggregate {
    pub summary: DailySummary,
    pub priority: BTreeMap<PriorityTopic, PriorityTopicBreakdown>,
}

impl Aggregate {
    pub fn has_priority(&self) -> bool {
        self.priority.values().any(|b| b.present)
    }
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    tables: Arc<KeywordTables>,
    representative_cap: usize,
}

fn mean(scores: &[i32]) -> Option<f64> {
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64)
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl Aggregator {
    pub fn new(tables: Arc<KeywordTables>, representative_cap: usize) -> Self {
        Self {
            tables,
            representative_cap,
        }
    }

    /// Topics an article belongs to: keyword hit or linked category.
    pub fn topics_of(&self, scored: &ScoredArticle) -> Vec<PriorityTopic> {
        let text = FoldedText::new(&scored.article.text());
        self.tables
            .priority_topics
            .iter()
            .filter(|t| {
                t.categories.contains(&scored.classification.category)
                    || t.keywords.iter().any(|k| text.contains(k))
            })
            .map(|t| t.topic)
            .collect()
    }

    pub fn aggregate(&self, date: NaiveDate, scored: &[ScoredArticle]) -> Aggregate {
        let mut summary = DailySummary::empty(date);
        let mut members: BTreeMap<PriorityTopic, Vec<&ScoredArticle>> =
            PriorityTopic::ALL.into_iter().map(|t| (t, Vec::new())).collect();

        let all: Vec<i32> = scored.iter().map(|s| s.impact_score.get()).collect();
        let by_region = |r: Region| -> Vec<i32> {
            scored
                .iter()
                .filter(|s| s.classification.region == r)
                .map(|s| s.impact_score.get())
                .collect()
        };
        let domestic = by_region(Region::Domestic);
        let foreign = by_region(Region::Foreign);

        let mut macro_hits = 0usize;
        for s in scored {
            let topics = self.topics_of(s);
            if !topics.is_empty() {
                macro_hits += 1;
            }
            for t in topics {
                if let Some(v) = members.get_mut(&t) {
                    v.push(s);
                }
            }
        }

        summary.news_count = all.len();
        summary.domestic_count = domestic.len();
        summary.foreign_count = foreign.len();
        for (subset, scores, slot) in [
            (ScoreSubset::All, &all, &mut summary.total_score),
            (ScoreSubset::Domestic, &domestic, &mut summary.domestic_score),
            (ScoreSubset::Foreign, &foreign, &mut summary.foreign_score),
        ] {
            if let Some(m) = mean(scores) {
                *slot = m;
                summary.no_data.remove(&subset);
            }
        }

        let n = all.len();
        summary.zero_count = all.iter().filter(|&&s| s == 0).count();
        summary.zero_ratio = percent(summary.zero_count, n);
        summary.plus2_ratio = percent(all.iter().filter(|&&s| s >= 2).count(), n);
        summary.minus2_ratio = percent(all.iter().filter(|&&s| s <= -2).count(), n);
        summary.macro_ratio = percent(macro_hits, n);

        let priority = members
            .into_iter()
            .map(|(topic, list)| (topic, self.breakdown(topic, list)))
            .collect();

        Aggregate { summary, priority }
    }

    fn breakdown(&self, topic: PriorityTopic, mut list: Vec<&ScoredArticle>) -> PriorityTopicBreakdown {
        let scores: Vec<i32> = list.iter().map(|s| s.impact_score.get()).collect();
        list.sort_by(|a, b| {
            b.impact_score
                .get()
                .abs()
                .cmp(&a.impact_score.get().abs())
                .then_with(|| b.article.published_at.cmp(&a.article.published_at))
        });
        PriorityTopicBreakdown {
            label: topic.label().to_string(),
            present: !list.is_empty(),
            count: list.len(),
            average_score: mean(&scores).unwrap_or(0.0),
            articles: list
                .into_iter()
                .take(self.representative_cap)
                .map(ArticleDigest::from)
                .collect(),
        }
    }
}
