// ⚙️ Configuration - matcher tuning and process settings
//
// MatcherConfig: field weights, result limit, status vocabulary, warning thresholds
// Settings: resolved once at startup from the environment

use crate::error::{MatchError, Result};
use crate::identity::Field;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

// ============================================================================
// CONSTANTS
// ============================================================================

pub const DEFAULT_DB_PATH: &str = "dss-matcher.db";
pub const ENV_DB_PATH: &str = "DSS_MATCHER_DB";
pub const ENV_CONFIG_PATH: &str = "DSS_MATCHER_CONFIG";

/// Status values a match can carry, least advanced first.
pub const DEFAULT_STATUS_VOCABULARY: [&str; 4] = ["assigned", "reviewed", "confirmed", "rejected"];

/// Status every freshly assigned match carries in the status view.
pub const ASSIGNED_STATUS: &str = "assigned";

// ============================================================================
// MATCHER CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Per-field weight overrides; fields not listed weigh 1.0
    pub weights: BTreeMap<Field, f64>,
    /// Candidates returned per search; `None` or 0 returns every ranked candidate
    pub max_results: Option<usize>,
    /// Upper bound on scoring threads; `None` uses the global rayon pool
    pub parallelism: Option<usize>,
    pub register_page_size: usize,
    pub status_vocabulary: Vec<String>,
    pub low_name_score_threshold: f64,
    pub birth_year_gap_warn: i32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            weights: BTreeMap::new(),
            max_results: Some(100),
            parallelism: None,
            register_page_size: 1000,
            status_vocabulary: DEFAULT_STATUS_VOCABULARY
                .iter()
                .map(|s| s.to_string())
                .collect(),
            low_name_score_threshold: 0.35,
            birth_year_gap_warn: 10,
        }
    }
}

impl MatcherConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| MatchError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: MatcherConfig = serde_json::from_str(&raw)
            .map_err(|e| MatchError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn weight(&self, field: Field) -> f64 {
        self.weights.get(&field).copied().unwrap_or(1.0)
    }

    pub fn with_weight(mut self, field: Field, weight: f64) -> Self {
        self.weights.insert(field, weight);
        self
    }

    pub fn result_limit(&self) -> Option<usize> {
        self.max_results.filter(|n| *n > 0)
    }

    /// Ordinal of `status` in the vocabulary, if known
    pub fn status_rank(&self, status: &str) -> Option<usize> {
        self.status_vocabulary.iter().position(|s| s == status)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(MatchError::Config(format!(
                    "weight for {} must be a finite number >= 0, got {}",
                    field, weight
                )));
            }
        }

        if self.parallelism == Some(0) {
            return Err(MatchError::Config("parallelism must be at least 1".into()));
        }

        if self.register_page_size == 0 {
            return Err(MatchError::Config("register_page_size must be at least 1".into()));
        }

        if self.status_vocabulary.is_empty() {
            return Err(MatchError::Config("status_vocabulary cannot be empty".into()));
        }
        let mut seen = HashSet::new();
        for status in &self.status_vocabulary {
            if status.trim().is_empty() {
                return Err(MatchError::Config("status_vocabulary contains a blank entry".into()));
            }
            if !seen.insert(status.as_str()) {
                return Err(MatchError::Config(format!(
                    "status_vocabulary lists {:?} twice",
                    status
                )));
            }
        }
        if self.status_rank(ASSIGNED_STATUS).is_none() {
            return Err(MatchError::Config(format!(
                "status_vocabulary must contain {:?}",
                ASSIGNED_STATUS
            )));
        }

        if !(0.0..=1.0).contains(&self.low_name_score_threshold) {
            return Err(MatchError::Config(format!(
                "low_name_score_threshold must be within [0, 1], got {}",
                self.low_name_score_threshold
            )));
        }

        if self.birth_year_gap_warn < 0 {
            return Err(MatchError::Config("birth_year_gap_warn cannot be negative".into()));
        }

        Ok(())
    }
}

// ============================================================================
// SETTINGS
// ============================================================================

/// Process settings resolved at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub config_path: Option<PathBuf>,
}

impl Settings {
    /// Read settings from the environment (after any `.env` file has been loaded).
    pub fn from_env() -> Self {
        let db_path = std::env::var(ENV_DB_PATH)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let config_path = std::env::var(ENV_CONFIG_PATH)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Settings {
            db_path,
            config_path,
        }
    }

    pub fn load_matcher_config(&self) -> Result<MatcherConfig> {
        match &self.config_path {
            Some(path) => MatcherConfig::from_json_file(path),
            None => Ok(MatcherConfig::default()),
        }
    }
}
