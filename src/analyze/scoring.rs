// src/analyze/scoring.rs
//! Impact scoring.
//!
//! score = direction × intensity × breadth, rounded half away from zero and
//! clamped to [-10, 10].
//!
//! - direction: Σ weight × occurrences over the signed weight table
//! - intensity: short 0.5 / medium 1.0 / long 1.5 (picks `time_horizon`)
//! - breadth: company 0.5 / industry 1.0 / market 1.5
//!
//! An axis with no matching keywords is neutral and contributes 1.0.
//! Confidence counts the non-neutral axes and maps 0..=3 onto 0..=5.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::analyze::classifier::Classification;
use crate::config::keywords::Tier;
use crate::config::KeywordTables;
use crate::ingest::types::Article;
use crate::text::FoldedText;

pub const MIN_SCORE: i32 = -10;
pub const MAX_SCORE: i32 = 10;
pub const MAX_CONFIDENCE: u8 = 5;

/// Multiplier for an axis with no keyword evidence.
const NEUTRAL_MULTIPLIER: f64 = 1.0;

/// Keywords quoted in a directional reason.
const REASON_KEYWORDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeHorizon {
    Short,
    Medium,
    Long,
}

impl fmt::Display for TimeHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeHorizon::Short => "short",
            TimeHorizon::Medium => "medium",
            TimeHorizon::Long => "long",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breadth {
    Company,
    Industry,
    Market,
}

impl fmt::Display for Breadth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Breadth::Company => "company",
            Breadth::Industry => "industry",
            Breadth::Market => "market",
        })
    }
}

/// Integer impact in [-10, 10].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImpactScore(i32);

impl ImpactScore {
    pub const ZERO: ImpactScore = ImpactScore(0);

    pub fn new(v: i32) -> Self {
        Self(v.clamp(MIN_SCORE, MAX_SCORE))
    }

    /// Round half away from zero, then clamp. Non-finite input maps to zero.
    pub fn from_raw(raw: f64) -> Self {
        if !raw.is_finite() {
            return Self::ZERO;
        }
        let clamped = raw.round().clamp(MIN_SCORE as f64, MAX_SCORE as f64);
        Self(clamped as i32)
    }

    pub fn get(self) -> i32 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ImpactScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

/// Agreement of the scoring axes, 0..=5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(u8);

impl Confidence {
    /// 0, 1, 2, 3 non-neutral axes → 0, 2, 3, 5.
    pub fn from_axes(non_neutral: usize) -> Self {
        let n = non_neutral.min(3) as u8;
        Self((n * MAX_CONFIDENCE + 1) / 3)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// One matched direction keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factor {
    pub keyword: String,
    pub weight: i32,
    pub occurrences: usize,
}

impl Factor {
    pub fn contribution(&self) -> i32 {
        self.weight * self.occurrences as i32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Uncertainty {
    /// Hedging language ("may", "could", "uncertain", ...).
    Hedge { keyword: String },
    /// Positive and negative evidence of comparable size.
    Conflict { positive: i32, negative: i32 },
}

impl fmt::Display for Uncertainty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uncertainty::Hedge { keyword } => write!(f, "hedged wording: {keyword}"),
            Uncertainty::Conflict { positive, negative } => {
                write!(f, "mixed signals (+{positive} / -{negative})")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WithheldReason {
    NoKeywordMatch,
    ConflictingSignalsCancelled,
    CategoryNotScorable,
}

impl WithheldReason {
    pub fn as_str(self) -> &'static str {
        match self {
            WithheldReason::NoKeywordMatch => "no-keyword-match",
            WithheldReason::ConflictingSignalsCancelled => "conflicting-signals-cancelled",
            WithheldReason::CategoryNotScorable => "category-not-scorable",
        }
    }
}

impl fmt::Display for WithheldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WithheldReason::NoKeywordMatch => "no scoring keywords matched",
            WithheldReason::ConflictingSignalsCancelled => "positive and negative signals cancel out",
            WithheldReason::CategoryNotScorable => "category is not scored",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

/// |score| ≥ 5 strong, ≥ 2 moderate, otherwise weak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Strong,
    Moderate,
    Weak,
}

impl ScoreBand {
    pub fn of(score: ImpactScore) -> Self {
        match score.get().abs() {
            a if a >= 5 => ScoreBand::Strong,
            a if a >= 2 => ScoreBand::Moderate,
            _ => ScoreBand::Weak,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ScoreReason {
    Directional {
        direction: Direction,
        band: ScoreBand,
        keywords: Vec<String>,
    },
    /// Evidence present but too small to survive rounding.
    Negligible { keywords: Vec<String> },
    Withheld { reason: WithheldReason },
}

impl fmt::Display for ScoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreReason::Directional {
                direction,
                band,
                keywords,
            } => {
                let strength = match band {
                    ScoreBand::Strong => "strong",
                    ScoreBand::Moderate => "moderate",
                    ScoreBand::Weak => "weak",
                };
                let side = match direction {
                    Direction::Positive => "positive",
                    Direction::Negative => "negative",
                };
                write!(f, "{strength} {side} factors: {}", keywords.join(", "))
            }
            ScoreReason::Negligible { keywords } => {
                write!(f, "negligible net effect: {}", keywords.join(", "))
            }
            ScoreReason::Withheld { reason } => write!(f, "evaluation withheld: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub article: Article,
    pub classification: Classification,
    pub impact_score: ImpactScore,
    pub confidence: Confidence,
    pub time_horizon: TimeHorizon,
    pub breadth: Breadth,
    pub positive_factors: Vec<Factor>,
    pub negative_factors: Vec<Factor>,
    pub uncertainty_factors: Vec<Uncertainty>,
    pub score_reason: ScoreReason,
}

impl ScoredArticle {
    pub fn withheld(&self) -> Option<WithheldReason> {
        match self.score_reason {
            ScoreReason::Withheld { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn is_withheld(&self) -> bool {
        self.withheld().is_some()
    }
}

/// Outcome of one tiered axis.
#[derive(Debug, Clone, Copy)]
struct AxisPick<T> {
    level: T,
    multiplier: f64,
    matched: bool,
}

// Tiers arrive in tie-preference order; strict `>` keeps the preferred tier.
fn pick_tier<T: Copy>(text: &FoldedText, tiers: &[Tier<T>], neutral: T) -> AxisPick<T> {
    let mut best: Option<(usize, &Tier<T>)> = None;
    for tier in tiers {
        let n = text.count_any(&tier.keywords);
        if n > 0 && best.map_or(true, |(b, _)| n > b) {
            best = Some((n, tier));
        }
    }
    match best {
        Some((_, tier)) => AxisPick {
            level: tier.level,
            multiplier: tier.multiplier,
            matched: true,
        },
        None => AxisPick {
            level: neutral,
            multiplier: NEUTRAL_MULTIPLIER,
            matched: false,
        },
    }
}

#[derive(Debug, Clone)]
pub struct Scorer {
    tables: Arc<KeywordTables>,
}

impl Scorer {
    pub fn new(tables: Arc<KeywordTables>) -> Self {
        Self { tables }
    }

    pub fn score(&self, article: &Article, classification: &Classification) -> ScoredArticle {
        let text = FoldedText::new(&article.text());

        let intensity = pick_tier(&text, &self.tables.intensity, TimeHorizon::Medium);
        let breadth = pick_tier(&text, &self.tables.breadth, Breadth::Industry);
        let matched_axes = usize::from(intensity.matched) + usize::from(breadth.matched);

        let mut scored = ScoredArticle {
            article: article.clone(),
            classification: classification.clone(),
            impact_score: ImpactScore::ZERO,
            confidence: Confidence::from_axes(matched_axes),
            time_horizon: intensity.level,
            breadth: breadth.level,
            positive_factors: Vec::new(),
            negative_factors: Vec::new(),
            uncertainty_factors: Vec::new(),
            score_reason: ScoreReason::Withheld {
                reason: WithheldReason::NoKeywordMatch,
            },
        };

        if !self.tables.is_scorable(classification.category) {
            scored.score_reason = ScoreReason::Withheld {
                reason: WithheldReason::CategoryNotScorable,
            };
            tracing::debug!(target: "scorer", id = %article.id, category = %classification.category, "category not scored");
            return scored;
        }

        for wk in &self.tables.direction {
            let occurrences = text.count(&wk.keyword);
            if occurrences == 0 {
                continue;
            }
            let factor = Factor {
                keyword: wk.keyword.raw.clone(),
                weight: wk.weight,
                occurrences,
            };
            if wk.weight > 0 {
                scored.positive_factors.push(factor);
            } else {
                scored.negative_factors.push(factor);
            }
        }

        let positive: i32 = scored.positive_factors.iter().map(Factor::contribution).sum();
        let negative: i32 = -scored
            .negative_factors
            .iter()
            .map(Factor::contribution)
            .sum::<i32>();
        let direction = positive - negative;

        scored.uncertainty_factors = self
            .tables
            .hedges
            .iter()
            .filter(|h| text.contains(h))
            .map(|h| Uncertainty::Hedge {
                keyword: h.raw.clone(),
            })
            .collect();
        if positive > 0 && negative > 0 && 2 * positive.min(negative) >= positive.max(negative) {
            scored
                .uncertainty_factors
                .push(Uncertainty::Conflict { positive, negative });
        }

        let has_factors = !(scored.positive_factors.is_empty() && scored.negative_factors.is_empty());
        scored.confidence = Confidence::from_axes(matched_axes + usize::from(has_factors));
        if !has_factors {
            return scored;
        }
        if direction == 0 {
            scored.score_reason = ScoreReason::Withheld {
                reason: WithheldReason::ConflictingSignalsCancelled,
            };
            return scored;
        }

        let raw = direction as f64 * intensity.multiplier * breadth.multiplier;
        scored.impact_score = ImpactScore::from_raw(raw);

        let keywords = top_keywords(&scored, direction > 0);
        scored.score_reason = if scored.impact_score.is_zero() {
            ScoreReason::Negligible { keywords }
        } else {
            ScoreReason::Directional {
                direction: if direction > 0 {
                    Direction::Positive
                } else {
                    Direction::Negative
                },
                band: ScoreBand::of(scored.impact_score),
                keywords,
            }
        };

        tracing::debug!(
            target: "scorer",
            id = %article.id,
            score = scored.impact_score.get(),
            raw,
            horizon = %scored.time_horizon,
            breadth = %scored.breadth,
            "scored"
        );
        scored
    }
}

// Strongest contributions on the winning side, ties in table order.
fn top_keywords(scored: &ScoredArticle, positive_side: bool) -> Vec<String> {
    let side = if positive_side {
        &scored.positive_factors
    } else {
        &scored.negative_factors
    };
    let mut ranked: Vec<&Factor> = side.iter().collect();
    ranked.sort_by_key(|f| std::cmp::Reverse(f.contribution().abs()));
    ranked
        .into_iter()
        .take(REASON_KEYWORDS)
        .map(|f| f.keyword.clone())
        .collect()
}
