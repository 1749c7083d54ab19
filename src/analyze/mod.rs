// src/analyze/mod.rs
//! Per-article analysis: category/region classification, impact scoring and
//! market-sensitive remark detection. All are pure functions of the article
//! text and the keyword tables.

pub mod classifier;
pub mod remarks;
pub mod scoring;

pub use classifier::{Category, Classification, Classifier, Region, RegionEvidence};
pub use remarks::{group_by_speaker, MarketRemark, RemarkDetector, SpeakerRemarks};
pub use scoring::{
    Breadth, Confidence, Direction, Factor, ImpactScore, ScoreBand, ScoreReason, ScoredArticle,
    Scorer, TimeHorizon, Uncertainty, WithheldReason,
};
