//! Keyword tables for classification, scoring, priority-topic detection and
//! market-sensitive remarks.
//!
//! Tables are plain data loaded once at startup (TOML) and handed to the
//! classifier/scorer/aggregator constructors. The shipped defaults live in
//! `config/keywords.toml` and are embedded in the binary; set
//! `OBSERVER_KEYWORDS_PATH` to load a different file.
//!
//! Loading validates everything the scorer relies on. A table that fails
//! validation is a fatal startup error.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::aggregate::PriorityTopic;
use crate::analyze::classifier::Category;
use crate::analyze::scoring::{Breadth, TimeHorizon};
use crate::error::{ConfigError, ConfigResult};
use crate::text::Keyword;

pub const ENV_KEYWORDS_PATH: &str = "OBSERVER_KEYWORDS_PATH";

const BUILTIN_TABLES: &str = include_str!("../../config/keywords.toml");

/// The only multipliers the intensity and breadth axes may use.
pub const ALLOWED_MULTIPLIERS: [f64; 3] = [0.5, 1.0, 1.5];

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
struct TablesRoot {
    #[serde(default)]
    unscored_categories: Vec<Category>,
    #[serde(default)]
    hedges: Vec<String>,
    #[serde(default)]
    region: RegionCfg,
    #[serde(default)]
    categories: Vec<CategoryCfg>,
    #[serde(default)]
    direction: Vec<DirectionCfg>,
    #[serde(default)]
    intensity: Vec<IntensityCfg>,
    #[serde(default)]
    breadth: Vec<BreadthCfg>,
    #[serde(default)]
    priority_topics: Vec<TopicCfg>,
    #[serde(default)]
    speakers: Vec<SpeakerCfg>,
    #[serde(default)]
    remark_contexts: Vec<RemarkContextCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RegionCfg {
    #[serde(default)]
    domestic_terms: Vec<String>,
    #[serde(default)]
    foreign_terms: Vec<String>,
    #[serde(default)]
    domestic_sources: Vec<String>,
    #[serde(default)]
    foreign_sources: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryCfg {
    name: Category,
    keywords: Vec<String>,
    #[serde(default)]
    subcategories: Vec<SubCategoryCfg>,
}

#[derive(Debug, Clone, Deserialize)]
struct SubCategoryCfg {
    name: String,
    keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DirectionCfg {
    keyword: String,
    weight: i32,
}

#[derive(Debug, Clone, Deserialize)]
struct IntensityCfg {
    horizon: TimeHorizon,
    multiplier: f64,
    keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct BreadthCfg {
    scope: Breadth,
    multiplier: f64,
    keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TopicCfg {
    topic: PriorityTopic,
    #[serde(default)]
    categories: Vec<Category>,
    keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpeakerCfg {
    name: String,
    keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RemarkContextCfg {
    name: String,
    keywords: Vec<String>,
    /// Fallback summary for the context.
    summary: String,
    /// Keyword-specific summaries; keys must be listed in `keywords`.
    #[serde(default)]
    summaries: BTreeMap<String, String>,
}

/* ----------------------------
Compiled tables
---------------------------- */

#[derive(Debug, Clone)]
pub struct CategoryTable {
    pub category: Category,
    pub keywords: Vec<Keyword>,
    pub subcategories: Vec<SubCategoryTable>,
}

#[derive(Debug, Clone)]
pub struct SubCategoryTable {
    pub name: String,
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    pub domestic_terms: Vec<Keyword>,
    pub foreign_terms: Vec<Keyword>,
    pub domestic_sources: Vec<Keyword>,
    pub foreign_sources: Vec<Keyword>,
}

#[derive(Debug, Clone)]
pub struct WeightedKeyword {
    pub keyword: Keyword,
    pub weight: i32,
}

#[derive(Debug, Clone)]
pub struct Tier<T> {
    pub level: T,
    pub multiplier: f64,
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone)]
pub struct TopicTable {
    pub topic: PriorityTopic,
    pub categories: Vec<Category>,
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone)]
pub struct SpeakerTable {
    pub name: String,
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone)]
pub struct RemarkContextTable {
    pub name: String,
    pub keywords: Vec<Keyword>,
    pub summary: String,
    pub summaries: Vec<(Keyword, String)>,
}

impl RemarkContextTable {
    /// Summary of the first matched keyword that has its own, else the fallback.
    pub fn summary_for(&self, matched: &[&Keyword]) -> &str {
        matched
            .iter()
            .find_map(|m| {
                self.summaries
                    .iter()
                    .find(|(k, _)| k.folded() == m.folded())
                    .map(|(_, s)| s.as_str())
            })
            .unwrap_or(self.summary.as_str())
    }
}

/// Validated, immutable keyword tables.
#[derive(Debug, Clone)]
pub struct KeywordTables {
    /// Ordered by category priority (see [`Category::ALL`]).
    pub categories: Vec<CategoryTable>,
    pub region: RegionTable,
    pub direction: Vec<WeightedKeyword>,
    pub hedges: Vec<Keyword>,
    /// One tier per horizon, ordered by tie preference (long first).
    pub intensity: Vec<Tier<TimeHorizon>>,
    /// One tier per scope, ordered by tie preference (market first).
    pub breadth: Vec<Tier<Breadth>>,
    pub priority_topics: Vec<TopicTable>,
    pub unscored: BTreeSet<Category>,
    /// Speakers whose remarks are tracked, first match wins.
    pub speakers: Vec<SpeakerTable>,
    /// Market-sensitive contexts in match order.
    pub remark_contexts: Vec<RemarkContextTable>,
}

impl KeywordTables {
    /// Tables compiled into the binary.
    pub fn builtin() -> ConfigResult<Self> {
        Self::from_toml_str(BUILTIN_TABLES)
    }

    /// Load from `$OBSERVER_KEYWORDS_PATH` when set, otherwise the builtin tables.
    pub fn from_env() -> ConfigResult<Self> {
        match std::env::var(ENV_KEYWORDS_PATH) {
            Ok(p) if !p.trim().is_empty() => Self::load(Path::new(p.trim())),
            _ => Self::builtin(),
        }
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(toml_str: &str) -> ConfigResult<Self> {
        let root: TablesRoot = toml::from_str(toml_str)?;
        compile(root)
    }

    pub fn is_scorable(&self, category: Category) -> bool {
        !self.unscored.contains(&category)
    }
}

/* ----------------------------
Compilation + validation
---------------------------- */

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

fn keywords(list: &[String], ctx: &str) -> ConfigResult<Vec<Keyword>> {
    list.iter()
        .map(|raw| Keyword::new(raw.as_str()).ok_or_else(|| invalid(format!("{ctx}: empty keyword `{raw}`"))))
        .collect()
}

fn check_multiplier(m: f64, ctx: &str) -> ConfigResult<()> {
    if ALLOWED_MULTIPLIERS.iter().any(|a| (a - m).abs() < 1e-9) {
        Ok(())
    } else {
        Err(invalid(format!(
            "{ctx}: multiplier {m} not in {ALLOWED_MULTIPLIERS:?}"
        )))
    }
}

fn compile(root: TablesRoot) -> ConfigResult<KeywordTables> {
    // Direction weights: the scorer cannot run without them.
    if root.direction.is_empty() {
        return Err(invalid("direction weight table is empty"));
    }
    let mut seen = BTreeSet::new();
    let mut direction = Vec::with_capacity(root.direction.len());
    for d in &root.direction {
        if d.weight == 0 {
            return Err(invalid(format!("direction `{}` has zero weight", d.keyword)));
        }
        let keyword = Keyword::new(d.keyword.as_str())
            .ok_or_else(|| invalid(format!("direction: empty keyword `{}`", d.keyword)))?;
        if !seen.insert(keyword.folded().to_string()) {
            return Err(invalid(format!("direction `{}` listed twice", d.keyword)));
        }
        direction.push(WeightedKeyword {
            keyword,
            weight: d.weight,
        });
    }

    // Categories, kept in priority order regardless of file order.
    let mut categories = Vec::new();
    for c in &root.categories {
        if categories.iter().any(|t: &CategoryTable| t.category == c.name) {
            return Err(invalid(format!("category `{}` listed twice", c.name)));
        }
        let ctx = format!("category `{}`", c.name);
        let subcategories = c
            .subcategories
            .iter()
            .map(|s| {
                Ok(SubCategoryTable {
                    name: s.name.clone(),
                    keywords: keywords(&s.keywords, &format!("{ctx} / {}", s.name))?,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;
        categories.push(CategoryTable {
            category: c.name,
            keywords: keywords(&c.keywords, &ctx)?,
            subcategories,
        });
    }
    if categories.is_empty() {
        return Err(invalid("no category tables configured"));
    }
    categories.sort_by_key(|t| t.category);

    // Intensity tiers: exactly one per horizon.
    let mut intensity = Vec::with_capacity(3);
    for horizon in [TimeHorizon::Long, TimeHorizon::Medium, TimeHorizon::Short] {
        let mut tiers = root.intensity.iter().filter(|t| t.horizon == horizon);
        let tier = tiers
            .next()
            .ok_or_else(|| invalid(format!("missing intensity tier `{horizon}`")))?;
        if tiers.next().is_some() {
            return Err(invalid(format!("intensity tier `{horizon}` listed twice")));
        }
        let ctx = format!("intensity `{horizon}`");
        check_multiplier(tier.multiplier, &ctx)?;
        intensity.push(Tier {
            level: horizon,
            multiplier: tier.multiplier,
            keywords: keywords(&tier.keywords, &ctx)?,
        });
    }

    // Breadth tiers: exactly one per scope.
    let mut breadth = Vec::with_capacity(3);
    for scope in [Breadth::Market, Breadth::Industry, Breadth::Company] {
        let mut tiers = root.breadth.iter().filter(|t| t.scope == scope);
        let tier = tiers
            .next()
            .ok_or_else(|| invalid(format!("missing breadth tier `{scope}`")))?;
        if tiers.next().is_some() {
            return Err(invalid(format!("breadth tier `{scope}` listed twice")));
        }
        let ctx = format!("breadth `{scope}`");
        check_multiplier(tier.multiplier, &ctx)?;
        breadth.push(Tier {
            level: scope,
            multiplier: tier.multiplier,
            keywords: keywords(&tier.keywords, &ctx)?,
        });
    }

    // Priority topics: all six, once each, in fixed order.
    let mut priority_topics = Vec::with_capacity(PriorityTopic::ALL.len());
    for topic in PriorityTopic::ALL {
        let mut cfgs = root.priority_topics.iter().filter(|t| t.topic == topic);
        let cfg = cfgs
            .next()
            .ok_or_else(|| invalid(format!("missing priority topic `{topic}`")))?;
        if cfgs.next().is_some() {
            return Err(invalid(format!("priority topic `{topic}` listed twice")));
        }
        priority_topics.push(TopicTable {
            topic,
            categories: cfg.categories.clone(),
            keywords: keywords(&cfg.keywords, &format!("topic `{topic}`"))?,
        });
    }

    let mut speakers = Vec::with_capacity(root.speakers.len());
    for sp in &root.speakers {
        if sp.name.trim().is_empty() {
            return Err(invalid("speaker with empty name"));
        }
        let kws = keywords(&sp.keywords, &format!("speaker `{}`", sp.name))?;
        if kws.is_empty() {
            return Err(invalid(format!("speaker `{}` has no keywords", sp.name)));
        }
        speakers.push(SpeakerTable {
            name: sp.name.clone(),
            keywords: kws,
        });
    }

    let mut remark_contexts: Vec<RemarkContextTable> = Vec::with_capacity(root.remark_contexts.len());
    for rc in &root.remark_contexts {
        let ctx = format!("remark context `{}`", rc.name);
        if remark_contexts.iter().any(|t| t.name == rc.name) {
            return Err(invalid(format!("{ctx} listed twice")));
        }
        let kws = keywords(&rc.keywords, &ctx)?;
        if kws.is_empty() {
            return Err(invalid(format!("{ctx} has no keywords")));
        }
        let mut summaries = Vec::with_capacity(rc.summaries.len());
        for (raw, text) in &rc.summaries {
            let k = Keyword::new(raw.as_str())
                .ok_or_else(|| invalid(format!("{ctx}: empty summary keyword `{raw}`")))?;
            if !kws.iter().any(|c| c.folded() == k.folded()) {
                return Err(invalid(format!("{ctx}: summary keyword `{raw}` is not a context keyword")));
            }
            summaries.push((k, text.clone()));
        }
        remark_contexts.push(RemarkContextTable {
            name: rc.name.clone(),
            keywords: kws,
            summary: rc.summary.clone(),
            summaries,
        });
    }

    let region = RegionTable {
        domestic_terms: keywords(&root.region.domestic_terms, "region.domestic_terms")?,
        foreign_terms: keywords(&root.region.foreign_terms, "region.foreign_terms")?,
        domestic_sources: keywords(&root.region.domestic_sources, "region.domestic_sources")?,
        foreign_sources: keywords(&root.region.foreign_sources, "region.foreign_sources")?,
    };

    Ok(KeywordTables {
        categories,
        region,
        direction,
        hedges: keywords(&root.hedges, "hedges")?,
        intensity,
        breadth,
        priority_topics,
        unscored: root.unscored_categories.into_iter().collect(),
        speakers,
        remark_contexts,
    })
}
