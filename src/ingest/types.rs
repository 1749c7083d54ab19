// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Article record as delivered by a fetch client. Nothing is trusted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "body")]
    pub description: String,
    #[serde(default, alias = "source_name")]
    pub source: String,
    /// RFC 3339 preferred; see `ingest::parse_timestamp` for accepted forms.
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Validated and normalized article, ready for classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Short content fingerprint (hex of SHA-256 over the normalized text).
    pub id: String,
    pub title: String,
    pub description: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Article {
    /// Text the keyword tables run against: title, then body.
    pub fn text(&self) -> String {
        match (self.title.is_empty(), self.description.is_empty()) {
            (false, false) => format!("{} {}", self.title, self.description),
            (false, true) => self.title.clone(),
            _ => self.description.clone(),
        }
    }

    /// Title for display; falls back to the start of the body.
    pub fn headline(&self) -> String {
        if self.title.is_empty() {
            self.description.chars().take(60).collect()
        } else {
            self.title.clone()
        }
    }
}

/// Seam for news-retrieval clients. The engine never calls this itself.
#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_today(&self) -> Result<Vec<RawArticle>>;
    fn name(&self) -> &'static str;
}
