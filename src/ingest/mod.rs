// src/ingest/mod.rs
//! Intake: turn raw fetched records into validated articles.
//!
//! Malformed records are dropped with a reason and counted; the run always
//! continues with whatever is usable.

pub mod types;

use crate::error::ArticleError;
use crate::ingest::types::{Article, ArticleSource, RawArticle};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

const MAX_FIELD_CHARS: usize = 1500;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "observer_articles_received_total",
            "Raw articles handed to intake."
        );
        describe_counter!(
            "observer_articles_rejected_total",
            "Articles dropped as malformed (missing text or timestamp)."
        );
        describe_counter!(
            "observer_articles_duplicate_total",
            "Articles dropped as exact duplicates within a batch."
        );
        describe_counter!(
            "observer_source_errors_total",
            "Article source fetch errors."
        );
    });
}

/// Normalize text: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_FIELD_CHARS {
        out = out.chars().take(MAX_FIELD_CHARS).collect();
    }

    out
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or a bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Hex prefix of SHA-256 over the text; stable id for dedup and logs.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Validate and normalize a single record.
pub fn validate(raw: &RawArticle) -> Result<Article, ArticleError> {
    let title = normalize_text(&raw.title);
    let description = normalize_text(&raw.description);
    if title.is_empty() && description.is_empty() {
        return Err(ArticleError::MissingText);
    }

    let published_at = match raw.published_at.as_deref().map(str::trim) {
        None | Some("") => return Err(ArticleError::MissingTimestamp),
        Some(ts) => parse_timestamp(ts).ok_or_else(|| ArticleError::BadTimestamp(ts.to_string()))?,
    };

    let id = fingerprint(&format!("{title}\n{description}"));
    Ok(Article {
        id,
        title,
        description,
        source: normalize_text(&raw.source),
        published_at,
        url: raw
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
    })
}

/// A dropped record, identified by its position in the input batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub index: usize,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub error: ArticleError,
}

/// Result of running intake over one batch.
#[derive(Debug, Clone, Default)]
pub struct Intake {
    pub accepted: Vec<Article>,
    pub rejected: Vec<Rejection>,
    pub duplicates: usize,
    pub received: usize,
}

/// Validate, normalize, and drop in-batch duplicates (first occurrence wins).
pub fn prepare_batch(raw: Vec<RawArticle>) -> Intake {
    ensure_metrics_described();

    let received = raw.len();
    let mut accepted = Vec::with_capacity(received);
    let mut rejected = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicates = 0usize;

    for (index, r) in raw.into_iter().enumerate() {
        match validate(&r) {
            Ok(article) => {
                if !seen.insert(article.id.clone()) {
                    duplicates += 1;
                    tracing::debug!(target: "intake", id = %article.id, "duplicate article dropped");
                    continue;
                }
                accepted.push(article);
            }
            Err(error) => {
                tracing::warn!(target: "intake", index, %error, "malformed article dropped");
                rejected.push(Rejection {
                    index,
                    title: normalize_text(&r.title).chars().take(80).collect(),
                    error,
                });
            }
        }
    }

    counter!("observer_articles_received_total").increment(received as u64);
    counter!("observer_articles_rejected_total").increment(rejected.len() as u64);
    counter!("observer_articles_duplicate_total").increment(duplicates as u64);

    Intake {
        accepted,
        rejected,
        duplicates,
        received,
    }
}

/// Pull from every source; a failing source is logged and skipped.
pub async fn collect_from_sources(sources: &[Arc<dyn ArticleSource>]) -> Vec<RawArticle> {
    ensure_metrics_described();

    let mut raw = Vec::new();
    for s in sources {
        match s.fetch_today().await {
            Ok(mut v) => {
                tracing::info!(target: "intake", source = s.name(), count = v.len(), "fetched");
                raw.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "intake", error = ?e, source = s.name(), "source error");
                counter!("observer_source_errors_total").increment(1);
            }
        }
    }
    raw
}
