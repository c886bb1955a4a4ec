//! Health parameter analytics: trends, anomalies and the composite score,
//! plus the reference-range catalog they consult.
//!
//! Every operation is a pure function of the observations passed in. The
//! only shared state is the read-only `ReferenceCatalog`.

pub mod anomaly;
pub mod engine;
pub mod outlier;
pub mod reference;
pub mod score;
pub mod stats;
pub mod trend;
pub mod types;

pub use engine::AnalyticsEngine;
pub use outlier::{IsolationForest, UnivariateOutlierDetector};
pub use reference::{RangeTableEntry, ReferenceCatalog, ReferenceRange};
pub use types::{
    AnalyticsError, AnomalyFinding, HealthScore, SeriesPoint, TrendOutcome, TrendResult,
};
