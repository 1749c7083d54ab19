// src/analyze/classifier.rs
//! Category and region assignment.
//!
//! Category: the table with the most keyword occurrences wins; ties go to the
//! category listed first in [`Category::ALL`]. Nothing matched means `other`.
//!
//! Region: domestic means "Japan viewpoint" (domestic terms in the text, or a
//! domestic source name). An article that matches both sets or neither is
//! treated as foreign; [`RegionEvidence`] records which case applied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::KeywordTables;
use crate::ingest::types::Article;
use crate::text::FoldedText;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    MonetaryPolicy,
    Employment,
    Inflation,
    Currency,
    Equities,
    Geopolitics,
    Corporate,
    Other,
}

impl Category {
    /// Tie-break priority, highest first.
    pub const ALL: [Category; 8] = [
        Category::MonetaryPolicy,
        Category::Employment,
        Category::Inflation,
        Category::Currency,
        Category::Equities,
        Category::Geopolitics,
        Category::Corporate,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::MonetaryPolicy => "monetary-policy",
            Category::Employment => "employment",
            Category::Inflation => "inflation",
            Category::Currency => "currency",
            Category::Equities => "equities",
            Category::Geopolitics => "geopolitics",
            Category::Corporate => "corporate",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Domestic,
    Foreign,
}

/// Which region term sets actually matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionEvidence {
    Domestic,
    Foreign,
    Both,
    Neither,
}

impl RegionEvidence {
    fn from_hits(domestic: bool, foreign: bool) -> Self {
        match (domestic, foreign) {
            (true, false) => RegionEvidence::Domestic,
            (false, true) => RegionEvidence::Foreign,
            (true, true) => RegionEvidence::Both,
            (false, false) => RegionEvidence::Neither,
        }
    }

    pub fn region(self) -> Region {
        match self {
            RegionEvidence::Domestic => Region::Domestic,
            _ => Region::Foreign,
        }
    }

    /// True when the region came from the ambiguity default.
    pub fn is_defaulted(self) -> bool {
        matches!(self, RegionEvidence::Both | RegionEvidence::Neither)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    pub region: Region,
    pub region_evidence: RegionEvidence,
    /// Keyword occurrences for the winning category (0 for the fallback).
    pub match_count: usize,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    tables: Arc<KeywordTables>,
}

impl Classifier {
    pub fn new(tables: Arc<KeywordTables>) -> Self {
        Self { tables }
    }

    pub fn classify(&self, article: &Article) -> Classification {
        let text = FoldedText::new(&article.text());
        let source = FoldedText::new(&article.source);
        let c = self.classify_folded(&text, &source);
        tracing::debug!(
            target: "classifier",
            id = %article.id,
            category = %c.category,
            region = ?c.region_evidence,
            matches = c.match_count,
            "classified"
        );
        c
    }

    pub(crate) fn classify_folded(&self, text: &FoldedText, source: &FoldedText) -> Classification {
        let mut best: Option<(usize, &crate::config::keywords::CategoryTable)> = None;
        // tables are sorted by priority, so strict `>` keeps the earlier one on ties
        for table in &self.tables.categories {
            let n = text.count_any(&table.keywords);
            if n > 0 && best.map_or(true, |(b, _)| n > b) {
                best = Some((n, table));
            }
        }

        let (category, sub_category, match_count) = match best {
            Some((n, table)) => {
                let sub = table
                    .subcategories
                    .iter()
                    .find(|s| s.keywords.iter().any(|k| text.contains(k)))
                    .map(|s| s.name.clone());
                (table.category, sub, n)
            }
            None => (Category::Other, None, 0),
        };

        let r = &self.tables.region;
        let domestic = r.domestic_terms.iter().any(|k| text.contains(k))
            || r.domestic_sources.iter().any(|k| source.contains(k));
        let foreign = r.foreign_terms.iter().any(|k| text.contains(k))
            || r.foreign_sources.iter().any(|k| source.contains(k));
        let region_evidence = RegionEvidence::from_hits(domestic, foreign);

        Classification {
            category,
            sub_category,
            region: region_evidence.region(),
            region_evidence,
            match_count,
        }
    }
}
