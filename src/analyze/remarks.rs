// src/analyze/remarks.rs
//! Market-sensitive remarks by tracked speakers.
//!
//! An article is a remark when its text names a configured speaker and at
//! least one context keyword. The first context (table order) with a hit
//! labels it, and the summary is templated from the matched keywords.
//! Remarks are surfaced as possible triggers; they carry the article's
//! score for reference but never change it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::analyze::scoring::{ImpactScore, ScoredArticle};
use crate::config::KeywordTables;
use crate::text::{FoldedText, Keyword};

const EXCERPT_CHARS: usize = 200;
const REMARKS_PER_SPEAKER: usize = 5;
const SOURCES_PER_SPEAKER: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRemark {
    pub article_id: String,
    pub speaker: String,
    pub context: String,
    pub summary: String,
    /// Matched context keywords, across all contexts, in table order.
    pub keywords: Vec<String>,
    pub headline: String,
    pub excerpt: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub impact_score: ImpactScore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeCount {
    pub context: String,
    pub count: usize,
}

/// Remarks of one speaker, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerRemarks {
    pub speaker: String,
    /// Every detected remark counted per context, first seen first.
    pub themes: Vec<ThemeCount>,
    /// Distinct summaries.
    pub count: usize,
    /// One remark per distinct summary, capped.
    pub remarks: Vec<MarketRemark>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RemarkDetector {
    tables: Arc<KeywordTables>,
}

impl RemarkDetector {
    pub fn new(tables: Arc<KeywordTables>) -> Self {
        Self { tables }
    }

    pub fn detect(&self, scored: &[ScoredArticle]) -> Vec<MarketRemark> {
        scored.iter().filter_map(|s| self.detect_one(s)).collect()
    }

    fn detect_one(&self, scored: &ScoredArticle) -> Option<MarketRemark> {
        let article = &scored.article;
        let full = article.text();
        let text = FoldedText::new(&full);

        let speaker = self
            .tables
            .speakers
            .iter()
            .find(|s| s.keywords.iter().any(|k| text.contains(k)))?;

        let mut matched: Vec<&Keyword> = Vec::new();
        let mut context = None;
        for table in &self.tables.remark_contexts {
            let hits = text.matched(&table.keywords);
            if !hits.is_empty() && context.is_none() {
                context = Some(table);
            }
            matched.extend(hits);
        }
        let context = context?;

        tracing::debug!(
            target: "remarks",
            id = %article.id,
            speaker = %speaker.name,
            context = %context.name,
            "market-sensitive remark"
        );

        Some(MarketRemark {
            article_id: article.id.clone(),
            speaker: speaker.name.clone(),
            context: context.name.clone(),
            summary: context.summary_for(&matched).to_string(),
            keywords: matched.iter().map(|k| k.raw.clone()).collect(),
            headline: article.headline(),
            excerpt: full.chars().take(EXCERPT_CHARS).collect(),
            source: article.source.clone(),
            url: article.url.clone(),
            published_at: article.published_at,
            impact_score: scored.impact_score,
        })
    }
}

/// Group by speaker in first-seen order. Repeated summaries collapse to
/// their first remark.
pub fn group_by_speaker(remarks: Vec<MarketRemark>) -> Vec<SpeakerRemarks> {
    let mut out: Vec<SpeakerRemarks> = Vec::new();
    for r in remarks {
        let idx = match out.iter().position(|g| g.speaker == r.speaker) {
            Some(i) => i,
            None => {
                out.push(SpeakerRemarks {
                    speaker: r.speaker.clone(),
                    themes: Vec::new(),
                    count: 0,
                    remarks: Vec::new(),
                    sources: Vec::new(),
                });
                out.len() - 1
            }
        };
        let group = &mut out[idx];

        match group.themes.iter_mut().find(|t| t.context == r.context) {
            Some(t) => t.count += 1,
            None => group.themes.push(ThemeCount {
                context: r.context.clone(),
                count: 1,
            }),
        }
        if !r.source.is_empty()
            && group.sources.len() < SOURCES_PER_SPEAKER
            && !group.sources.contains(&r.source)
        {
            group.sources.push(r.source.clone());
        }
        if group.remarks.iter().any(|x| x.summary == r.summary) {
            continue;
        }
        group.count += 1;
        if group.remarks.len() < REMARKS_PER_SPEAKER {
            group.remarks.push(r);
        }
    }
    out
}
