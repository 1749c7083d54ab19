//! history.rs — past daily summaries: in-memory window, comparison, stores.
//!
//! The window is ordered oldest → newest, holds one summary per date, and
//! prunes the oldest entry once it exceeds its capacity. A summary for a date
//! already present replaces the old one (re-running a day is idempotent).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::aggregate::DailySummary;

#[derive(Debug, Clone, Default)]
pub struct HistoryWindow {
    entries: VecDeque<DailySummary>,
    capacity: usize,
}

impl HistoryWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn from_summaries(capacity: usize, summaries: impl IntoIterator<Item = DailySummary>) -> Self {
        let mut w = Self::with_capacity(capacity);
        for s in summaries {
            w.push(s);
        }
        w
    }

    pub fn push(&mut self, summary: DailySummary) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.date == summary.date) {
            *existing = summary;
            return;
        }
        let at = self.entries.partition_point(|e| e.date < summary.date);
        self.entries.insert(at, summary);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Entries strictly before `date`, keeping this window's capacity.
    pub fn preceding(&self, date: NaiveDate) -> HistoryWindow {
        HistoryWindow::from_summaries(
            self.capacity,
            self.entries.iter().filter(|e| e.date < date).cloned(),
        )
    }

    /// Most recent entry ("yesterday" from the detector's point of view).
    pub fn latest(&self) -> Option<&DailySummary> {
        self.entries.back()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailySummary> {
        self.entries.iter().find(|e| e.date == date)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &DailySummary> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Last `n` entries' total scores, oldest first.
    pub fn trailing_totals(&self, n: usize) -> Vec<f64> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).map(|e| e.total_score).collect()
    }

    pub fn to_vec(&self) -> Vec<DailySummary> {
        self.entries.iter().cloned().collect()
    }
}

/// Today against the trailing-window averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryComparison {
    /// Days with data that went into the averages.
    pub days: usize,
    pub avg_total_score: f64,
    pub avg_zero_ratio: f64,
    pub avg_plus2_ratio: f64,
    pub avg_minus2_ratio: f64,
    pub total_score_delta: f64,
    pub zero_ratio_delta: f64,
}

impl HistoryComparison {
    /// `None` when no window entry has data.
    pub fn between(today: &DailySummary, window: &HistoryWindow) -> Option<Self> {
        let days: Vec<&DailySummary> = window.iter().filter(|e| e.has_data()).collect();
        if days.is_empty() {
            return None;
        }
        let n = days.len() as f64;
        let avg = |f: fn(&DailySummary) -> f64| days.iter().map(|d| f(d)).sum::<f64>() / n;

        let avg_total_score = avg(|d| d.total_score);
        let avg_zero_ratio = avg(|d| d.zero_ratio);
        Some(Self {
            days: days.len(),
            avg_total_score,
            avg_zero_ratio,
            avg_plus2_ratio: avg(|d| d.plus2_ratio),
            avg_minus2_ratio: avg(|d| d.minus2_ratio),
            total_score_delta: today.total_score - avg_total_score,
            zero_ratio_delta: today.zero_ratio - avg_zero_ratio,
        })
    }
}

/// Key-value store of daily summaries by date.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// The most recent `capacity` summaries.
    async fn window(&self, capacity: usize) -> Result<HistoryWindow>;
    /// The `capacity` summaries immediately before `date`, for backfills.
    async fn window_before(&self, date: NaiveDate, capacity: usize) -> Result<HistoryWindow>;
    /// `None` for dates no longer (or never) retained.
    async fn get(&self, date: NaiveDate) -> Result<Option<DailySummary>>;
    async fn append(&self, summary: DailySummary) -> Result<()>;
}

fn tail(all: &HistoryWindow, capacity: usize) -> HistoryWindow {
    let skip = all.len().saturating_sub(capacity);
    HistoryWindow::from_summaries(capacity, all.iter().skip(skip).cloned())
}

/// Process-local store; contents are lost on restart.
#[derive(Debug)]
pub struct MemoryHistoryStore {
    inner: Mutex<HistoryWindow>,
}

impl MemoryHistoryStore {
    pub fn new(retain: usize) -> Self {
        Self {
            inner: Mutex::new(HistoryWindow::with_capacity(retain)),
        }
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn window(&self, capacity: usize) -> Result<HistoryWindow> {
        Ok(tail(&*self.inner.lock().await, capacity))
    }

    async fn window_before(&self, date: NaiveDate, capacity: usize) -> Result<HistoryWindow> {
        Ok(tail(&self.inner.lock().await.preceding(date), capacity))
    }

    async fn get(&self, date: NaiveDate) -> Result<Option<DailySummary>> {
        Ok(self.inner.lock().await.get(date).cloned())
    }

    async fn append(&self, summary: DailySummary) -> Result<()> {
        self.inner.lock().await.push(summary);
        Ok(())
    }
}

/// JSON array of summaries on disk, oldest first.
#[derive(Debug)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
    retain: usize,
    // serialises read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileHistoryStore {
    pub fn new(path: impl Into<PathBuf>, retain: usize) -> Self {
        Self {
            path: path.into(),
            retain: retain.max(1),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HistoryWindow> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HistoryWindow::with_capacity(self.retain))
            }
            Err(e) => {
                return Err(e).with_context(|| format!("read history {}", self.path.display()))
            }
        };
        if raw.trim().is_empty() {
            return Ok(HistoryWindow::with_capacity(self.retain));
        }
        let list: Vec<DailySummary> = serde_json::from_str(&raw)
            .with_context(|| format!("parse history {}", self.path.display()))?;
        Ok(HistoryWindow::from_summaries(self.retain, list))
    }

    async fn store(&self, window: &HistoryWindow) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create history dir {}", dir.display()))?;
        }
        let body = serde_json::to_vec_pretty(&window.to_vec()).context("serialize history")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl HistoryStore for JsonFileHistoryStore {
    async fn window(&self, capacity: usize) -> Result<HistoryWindow> {
        let _guard = self.lock.lock().await;
        Ok(tail(&self.load().await?, capacity))
    }

    async fn window_before(&self, date: NaiveDate, capacity: usize) -> Result<HistoryWindow> {
        let _guard = self.lock.lock().await;
        Ok(tail(&self.load().await?.preceding(date), capacity))
    }

    async fn get(&self, date: NaiveDate) -> Result<Option<DailySummary>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.get(date).cloned())
    }

    async fn append(&self, summary: DailySummary) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut w = self.load().await?;
        let date = summary.date;
        w.push(summary);
        self.store(&w).await?;
        tracing::info!(target: "history", %date, entries = w.len(), "summary stored");
        Ok(())
    }
}
