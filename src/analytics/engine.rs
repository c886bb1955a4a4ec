use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::anomaly::{detect_anomalies, DetectionSettings};
use super::outlier::{IsolationForest, UnivariateOutlierDetector};
use super::reference::{RangeTableEntry, ReferenceCatalog};
use super::score::health_score;
use super::trend::calculate_trend;
use super::types::{AnalyticsError, AnomalyFinding, HealthScore, TrendOutcome};
use crate::config::AnalyticsConfig;
use crate::models::{Category, Observation, Stratum, Timeframe};

/// Entry point for the three analytical queries.
///
/// Holds only immutable state, so one instance is shared (behind `Arc`)
/// by every request. Each query recomputes from the observations it is given.
#[derive(Clone)]
pub struct AnalyticsEngine {
    catalog: Arc<ReferenceCatalog>,
    detector: Arc<dyn UnivariateOutlierDetector>,
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    /// Engine with an isolation forest sized from `config`.
    pub fn new(catalog: Arc<ReferenceCatalog>, config: AnalyticsConfig) -> Self {
        let detector = Arc::new(IsolationForest::new(config.tree_count, config.max_samples));
        Self::with_detector(catalog, config, detector)
    }

    pub fn with_detector(
        catalog: Arc<ReferenceCatalog>,
        config: AnalyticsConfig,
        detector: Arc<dyn UnivariateOutlierDetector>,
    ) -> Self {
        Self {
            catalog,
            detector,
            config,
        }
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Trend over `timeframe`, ending now.
    pub fn trend(
        &self,
        observations: &[Observation],
        parameter: &str,
        timeframe: Timeframe,
    ) -> Result<TrendOutcome, AnalyticsError> {
        self.trend_at(observations, parameter, timeframe, Utc::now())
    }

    /// Trend over `timeframe`, ending at `now`.
    pub fn trend_at(
        &self,
        observations: &[Observation],
        parameter: &str,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Result<TrendOutcome, AnalyticsError> {
        calculate_trend(
            observations,
            parameter,
            timeframe,
            now,
            self.config.trend_threshold_percent,
            &self.catalog,
        )
    }

    /// Most-recent-value anomalies across all parameters.
    pub fn anomalies(
        &self,
        observations: &[Observation],
    ) -> Result<Vec<AnomalyFinding>, AnalyticsError> {
        detect_anomalies(observations, self.detector.as_ref(), &self.detection_settings())
    }

    /// Composite health score. `stratum` picks stratified ranges (male if `None`).
    pub fn health_score(
        &self,
        observations: &[Observation],
        stratum: Option<Stratum>,
    ) -> Result<HealthScore, AnalyticsError> {
        health_score(observations, &self.catalog, stratum)
    }

    /// Full reference table for display.
    pub fn reference_ranges(&self) -> BTreeMap<Category, BTreeMap<String, RangeTableEntry>> {
        self.catalog.list_all()
    }

    fn detection_settings(&self) -> DetectionSettings {
        DetectionSettings {
            contamination: self.config.contamination,
            min_history: self.config.min_history,
            seed: self.config.seed,
        }
    }
}

impl std::fmt::Debug for AnalyticsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsEngine")
            .field("ranges", &self.catalog.ranges().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(Arc::new(ReferenceCatalog::builtin()), AnalyticsConfig::default())
    }
}
