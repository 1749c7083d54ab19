// src/config/mod.rs
//! Runtime configuration: thresholds, history window, and keyword tables.
//!
//! Resolution order for `ObserverConfig`:
//! 1) `$OBSERVER_CONFIG_PATH`
//! 2) `config/observer.toml`
//! 3) built-in defaults (missing file is not an error)
//!
//! `OBSERVER_HISTORY_WINDOW` overrides the trailing window length.

pub mod keywords;

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ConfigError, ConfigResult};

pub use keywords::KeywordTables;

pub const DEFAULT_OBSERVER_CONFIG_PATH: &str = "config/observer.toml";
pub const ENV_OBSERVER_CONFIG_PATH: &str = "OBSERVER_CONFIG_PATH";
pub const ENV_HISTORY_WINDOW: &str = "OBSERVER_HISTORY_WINDOW";

pub const DEFAULT_HISTORY_WINDOW: usize = 7;
pub const MAX_HISTORY_WINDOW: usize = 365;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub history: HistoryConfig,
    pub alerts: AlertThresholds,
    pub aggregate: AggregateConfig,
    pub notes: NoteThresholds,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Trailing summaries handed to the alert detector.
    pub window: usize,
    /// Days kept by the file-backed store.
    pub retain_days: i64,
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_HISTORY_WINDOW,
            retain_days: 30,
            path: PathBuf::from("state/history.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// |Δ total_score| vs yesterday.
    pub swing: f64,
    /// Swing magnitude at which the alert is raised as a warning.
    pub swing_warning: f64,
    /// |domestic − foreign|.
    pub divergence: f64,
    /// Moving-average length; reversal needs `ma_window + 1` history entries.
    pub ma_window: usize,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            swing: 3.0,
            swing_warning: 5.0,
            divergence: 5.0,
            ma_window: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub representative_cap: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            representative_cap: 5,
        }
    }
}

/// Percent thresholds for the observation notes.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct NoteThresholds {
    pub emerging_zero_below: f64,
    pub emerging_strong_above: f64,
    pub noise_zero_above: f64,
    pub noise_min_days: usize,
    pub one_sided_above: f64,
    pub macro_focus_above: f64,
}

impl Default for NoteThresholds {
    fn default() -> Self {
        Self {
            emerging_zero_below: 50.0,
            emerging_strong_above: 30.0,
            noise_zero_above: 80.0,
            noise_min_days: 2,
            one_sided_above: 50.0,
            macro_focus_above: 30.0,
        }
    }
}

impl ObserverConfig {
    /// Resolve the config file via env/defaults and apply env overrides.
    pub fn from_env() -> ConfigResult<Self> {
        let path = std::env::var(ENV_OBSERVER_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OBSERVER_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::load(&path)?
        } else {
            info!(target: "config", path = %path.display(), "observer config not found, using defaults");
            Self::default()
        };

        if let Some(w) = parse_window_env(std::env::var(ENV_HISTORY_WINDOW).ok()) {
            cfg.history.window = w;
        }
        Ok(cfg.sanitized())
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let cfg: ObserverConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    /// Clamp values that would make a rule meaningless back to defaults.
    fn sanitized(mut self) -> Self {
        if self.history.window == 0 {
            self.history.window = DEFAULT_HISTORY_WINDOW;
        }
        self.history.window = self.history.window.min(MAX_HISTORY_WINDOW);
        if self.history.retain_days < self.history.window as i64 {
            self.history.retain_days = self.history.window as i64;
        }

        let d = AlertThresholds::default();
        if !(self.alerts.swing.is_finite() && self.alerts.swing > 0.0) {
            self.alerts.swing = d.swing;
        }
        if !(self.alerts.divergence.is_finite() && self.alerts.divergence > 0.0) {
            self.alerts.divergence = d.divergence;
        }
        if !self.alerts.swing_warning.is_finite() || self.alerts.swing_warning < self.alerts.swing {
            self.alerts.swing_warning = self.alerts.swing.max(d.swing_warning);
        }
        if self.alerts.ma_window == 0 {
            self.alerts.ma_window = d.ma_window;
        }

        if self.aggregate.representative_cap == 0 {
            self.aggregate.representative_cap = AggregateConfig::default().representative_cap;
        }
        self
    }
}

// parse optional window env; zero/garbage ignored
fn parse_window_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&w| w > 0)
        .map(|w| w.min(MAX_HISTORY_WINDOW))
}
