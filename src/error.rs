//! Domain error kinds.
//!
//! Only configuration problems are fatal. Malformed articles are dropped by the
//! intake step and reported in the run's intake stats.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Keyword-table or observer configuration that cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid keyword tables: {0}")]
    Invalid(String),
}

/// Why a raw article was excluded from scoring.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ArticleError {
    #[error("article has neither title nor body text")]
    MissingText,

    #[error("article has no publish timestamp")]
    MissingTimestamp,

    #[error("unparseable publish timestamp `{0}`")]
    BadTimestamp(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
