use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AnomalySeverity, Category, Timeframe, TrendDirection};

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

/// One charting point of a trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub collected_at: DateTime<Utc>,
    pub value: f64,
}

/// Summary of one parameter over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub parameter: String,
    /// Catalog category, when the parameter is a known one.
    pub category: Option<Category>,
    /// Unit of the most recent observation in the window.
    pub unit: String,
    pub timeframe: Timeframe,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub direction: TrendDirection,
    /// First-to-last change; absent for single-point windows.
    pub change_percent: Option<f64>,
    pub series: Vec<SeriesPoint>,
}

/// Result of a trend query. An empty window is a normal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrendOutcome {
    Computed(TrendResult),
    NoData { parameter: String, message: String },
}

impl TrendOutcome {
    pub fn no_data(parameter: &str) -> Self {
        Self::NoData {
            parameter: parameter.to_string(),
            message: format!("No data available for parameter: {parameter}"),
        }
    }

    pub fn computed(&self) -> Option<&TrendResult> {
        match self {
            Self::Computed(result) => Some(result),
            Self::NoData { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Anomaly
// ---------------------------------------------------------------------------

/// A most-recent value that stands out from the user's own history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFinding {
    pub parameter: String,
    pub value: f64,
    pub collected_at: DateTime<Utc>,
    pub severity: AnomalySeverity,
}

// ---------------------------------------------------------------------------
// Health score
// ---------------------------------------------------------------------------

/// Weighted composite score in `[0, 100]`.
///
/// `computable == false` means no category had a scoreable observation;
/// `value` is then `0.0` and must not be read as a measured score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub value: f64,
    pub computable: bool,
    /// Sub-scores in `(0, 1]` for the categories that contributed.
    pub category_scores: BTreeMap<Category, f64>,
}

impl HealthScore {
    pub fn not_computable() -> Self {
        Self {
            value: 0.0,
            computable: false,
            category_scores: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// AnalyticsError
// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Computation failed for {parameter}: {message}")]
    Computation { parameter: String, message: String },

    #[error("No reference range for {category}/{parameter}")]
    CatalogLookupMiss { category: Category, parameter: String },

    #[error("Reference data load failed ({0}): {1}")]
    ReferenceDataLoad(String, String),

    #[error("Reference data parse failed ({0}): {1}")]
    ReferenceDataParse(String, String),

    #[error("Invalid reference range: {0}")]
    InvalidReferenceRange(String),
}

impl AnalyticsError {
    pub fn computation(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Computation {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

/// Rejects NaN and infinities before any arithmetic sees them.
pub(crate) fn ensure_finite(parameter: &str, values: &[f64]) -> Result<(), AnalyticsError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(bad) => Err(AnalyticsError::computation(
            parameter,
            format!("non-finite value {bad}"),
        )),
        None => Ok(()),
    }
}
