use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::anomaly::{CONTAMINATION, DEFAULT_SEED, MIN_HISTORY};
use crate::analytics::trend::DEFAULT_TREND_THRESHOLD_PERCENT;

/// Application-level constants
pub const APP_NAME: &str = "healthstats";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:19006"];

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "healthstats_lib=info,healthstats=info,tower_http=warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {0}: {1}")]
    Read(String, String),
    #[error("Cannot parse config {0}: {1}")]
    Parse(String, String),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ═══════════════════════════════════════════════════════════
// Analytics tunables
// ═══════════════════════════════════════════════════════════

/// Engine tunables. Every field has a default, so a partial JSON file works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Expected outlier share for the outlier model.
    pub contamination: f64,
    /// Observations a parameter needs before anomaly detection runs.
    pub min_history: usize,
    /// Seed for the outlier model.
    pub seed: u64,
    /// Percent change separating a moving trend from a stable one.
    pub trend_threshold_percent: f64,
    /// Isolation forest size.
    pub tree_count: usize,
    /// Points drawn per isolation tree.
    pub max_samples: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            contamination: CONTAMINATION,
            min_history: MIN_HISTORY,
            seed: DEFAULT_SEED,
            trend_threshold_percent: DEFAULT_TREND_THRESHOLD_PERCENT,
            tree_count: 100,
            max_samples: 256,
        }
    }
}

impl AnalyticsConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e.to_string()))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ConfigError::Invalid {
                field: "contamination",
                reason: format!("{} is outside (0, 0.5]", self.contamination),
            });
        }
        if self.min_history < 2 {
            return Err(ConfigError::Invalid {
                field: "min_history",
                reason: "must be at least 2".into(),
            });
        }
        if self.tree_count == 0 {
            return Err(ConfigError::Invalid {
                field: "tree_count",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_samples < 2 {
            return Err(ConfigError::Invalid {
                field: "max_samples",
                reason: "must be at least 2".into(),
            });
        }
        if !(self.trend_threshold_percent.is_finite() && self.trend_threshold_percent > 0.0) {
            return Err(ConfigError::Invalid {
                field: "trend_threshold_percent",
                reason: "must be a positive number".into(),
            });
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Server settings
// ═══════════════════════════════════════════════════════════

/// Settings for the HTTP query layer, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    pub analytics_config_path: Option<PathBuf>,
    pub reference_ranges_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("HEALTHSTATS_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            field: "HEALTHSTATS_BIND",
            reason: format!("'{bind_raw}' is not a socket address"),
        })?;

        let cors_origins = match lookup("HEALTHSTATS_CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        let path = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };

        Ok(Self {
            bind_addr,
            cors_origins,
            analytics_config_path: path("HEALTHSTATS_CONFIG"),
            reference_ranges_path: path("HEALTHSTATS_REFERENCE_RANGES"),
        })
    }
}
