use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical lookup key for a parameter name.
///
/// Case-insensitive, surrounding whitespace ignored, inner whitespace runs
/// collapsed to `_` (so "Total Cholesterol" and "total_cholesterol" agree).
/// Every component resolves parameter identity through this function.
pub fn normalize_parameter_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// One timestamped lab measurement, already normalized by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub parameter_name: String,
    pub value: f64,
    pub unit: String,
    pub collected_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(
        parameter_name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        collected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            parameter_name: parameter_name.into(),
            value,
            unit: unit.into(),
            collected_at,
        }
    }

    pub fn key(&self) -> String {
        normalize_parameter_name(&self.parameter_name)
    }
}

/// Observations of a single parameter, oldest first. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSeries {
    key: String,
    observations: Vec<Observation>,
}

impl ParameterSeries {
    /// Collects the observations whose name matches `parameter`.
    /// Returns `None` when nothing matches.
    pub fn select<'a, I>(parameter: &str, observations: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let key = normalize_parameter_name(parameter);
        let matching = observations
            .into_iter()
            .filter(|o| o.key() == key)
            .cloned()
            .collect();
        Self::from_observations(key, matching)
    }

    /// Builds a series from observations already known to share one key.
    /// Returns `None` for an empty vector.
    pub fn from_observations(key: String, mut observations: Vec<Observation>) -> Option<Self> {
        if observations.is_empty() {
            return None;
        }
        // Stable: same-instant observations keep their ingestion order.
        observations.sort_by_key(|o| o.collected_at);
        Some(Self { key, observations })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    pub fn latest(&self) -> &Observation {
        // Non-empty by construction.
        &self.observations[self.observations.len() - 1]
    }

    /// Keeps observations with `start <= collected_at <= end`.
    /// Returns `None` when the window holds nothing.
    pub fn within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        let kept: Vec<Observation> = self
            .observations
            .iter()
            .filter(|o| o.collected_at >= start && o.collected_at <= end)
            .cloned()
            .collect();
        if kept.is_empty() {
            None
        } else {
            Some(Self {
                key: self.key.clone(),
                observations: kept,
            })
        }
    }
}

/// Groups a user's observations into per-parameter series, keyed and
/// ordered by normalized parameter name.
pub fn group_by_parameter(observations: &[Observation]) -> BTreeMap<String, ParameterSeries> {
    let mut buckets: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
    for obs in observations {
        buckets.entry(obs.key()).or_default().push(obs.clone());
    }
    buckets
        .into_iter()
        .filter_map(|(key, obs)| {
            ParameterSeries::from_observations(key.clone(), obs).map(|s| (key, s))
        })
        .collect()
}
