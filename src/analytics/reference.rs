use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::AnalyticsError;
use crate::models::{normalize_parameter_name, Category, RangeStatus, Stratum};

/// Expected interval for one parameter, optionally per stratum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub category: Category,
    pub parameter_name: String,
    pub min: f64,
    pub max: f64,
    pub unit: String,
    #[serde(default)]
    pub stratum: Option<Stratum>,
}

impl ReferenceRange {
    pub fn status(&self, value: f64) -> RangeStatus {
        if value < self.min {
            RangeStatus::Low
        } else if value > self.max {
            RangeStatus::High
        } else {
            RangeStatus::Normal
        }
    }

    /// 1.0 inside `[min, max]`, `value / min` below, `max / value` above.
    /// Values under a non-positive minimum score 0.
    pub fn score_ratio(&self, value: f64) -> f64 {
        match self.status(value) {
            RangeStatus::Normal => 1.0,
            RangeStatus::Low if self.min > 0.0 => (value / self.min).max(0.0),
            RangeStatus::Low => 0.0,
            RangeStatus::High => self.max / value,
        }
    }

    fn key(&self) -> String {
        normalize_parameter_name(&self.parameter_name)
    }
}

/// Bounds as shown in the display table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

/// One parameter in the display table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RangeTableEntry {
    Uniform {
        min: f64,
        max: f64,
        unit: String,
    },
    Stratified {
        #[serde(skip_serializing_if = "Option::is_none")]
        male: Option<Bounds>,
        #[serde(skip_serializing_if = "Option::is_none")]
        female: Option<Bounds>,
        unit: String,
    },
}

/// Read-only table of reference ranges. Built once at startup and shared.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    ranges: Vec<ReferenceRange>,
}

impl ReferenceCatalog {
    /// Validate and wrap a set of ranges.
    ///
    /// Rejects inverted or non-finite bounds, duplicate
    /// `(category, parameter, stratum)` entries, and parameters that mix
    /// stratified with unstratified entries.
    pub fn from_ranges(ranges: Vec<ReferenceRange>) -> Result<Self, AnalyticsError> {
        let mut seen = HashSet::new();
        for range in &ranges {
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(AnalyticsError::InvalidReferenceRange(format!(
                    "{}: min {} / max {}",
                    range.parameter_name, range.min, range.max
                )));
            }
            if !seen.insert((range.category, range.key(), range.stratum)) {
                return Err(AnalyticsError::InvalidReferenceRange(format!(
                    "duplicate entry for {}/{}",
                    range.category, range.parameter_name
                )));
            }
        }

        for range in ranges.iter().filter(|r| r.stratum.is_some()) {
            if seen.contains(&(range.category, range.key(), None)) {
                return Err(AnalyticsError::InvalidReferenceRange(format!(
                    "{} mixes stratified and unstratified ranges",
                    range.parameter_name
                )));
            }
        }

        Ok(Self { ranges })
    }

    /// Load ranges from a JSON array of `ReferenceRange`.
    pub fn load(path: &Path) -> Result<Self, AnalyticsError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AnalyticsError::ReferenceDataLoad(path.display().to_string(), e.to_string())
        })?;
        let ranges: Vec<ReferenceRange> = serde_json::from_str(&json).map_err(|e| {
            AnalyticsError::ReferenceDataParse(path.display().to_string(), e.to_string())
        })?;
        let catalog = Self::from_ranges(ranges)?;
        tracing::info!(
            path = %path.display(),
            ranges = catalog.ranges.len(),
            "Loaded reference ranges"
        );
        Ok(catalog)
    }

    /// The bundled adult reference table.
    pub fn builtin() -> Self {
        use Category::*;
        use Stratum::*;

        let range = |category, name: &str, min, max, unit: &str, stratum| ReferenceRange {
            category,
            parameter_name: name.to_string(),
            min,
            max,
            unit: unit.to_string(),
            stratum,
        };

        Self {
            ranges: vec![
                range(Blood, "hemoglobin", 13.5, 17.5, "g/dL", Some(Male)),
                range(Blood, "hemoglobin", 12.0, 15.5, "g/dL", Some(Female)),
                range(Blood, "wbc", 4.5, 11.0, "10³/µL", None),
                range(Blood, "rbc", 4.7, 6.1, "10⁶/µL", Some(Male)),
                range(Blood, "rbc", 4.2, 5.4, "10⁶/µL", Some(Female)),
                range(Blood, "platelets", 150.0, 450.0, "10³/µL", None),
                range(Lipid, "total_cholesterol", 0.0, 200.0, "mg/dL", None),
                range(Lipid, "hdl", 40.0, 60.0, "mg/dL", None),
                range(Lipid, "ldl", 0.0, 100.0, "mg/dL", None),
                range(Lipid, "triglycerides", 0.0, 150.0, "mg/dL", None),
                range(Metabolic, "glucose", 70.0, 100.0, "mg/dL", None),
                range(Metabolic, "calcium", 8.5, 10.5, "mg/dL", None),
                range(Metabolic, "sodium", 135.0, 145.0, "mEq/L", None),
                range(Metabolic, "potassium", 3.5, 5.0, "mEq/L", None),
                range(Thyroid, "tsh", 0.4, 4.0, "mIU/L", None),
                range(Thyroid, "t3", 80.0, 200.0, "ng/dL", None),
                range(Thyroid, "t4", 5.0, 12.0, "µg/dL", None),
            ],
        }
    }

    /// Find the range for a parameter within a category.
    ///
    /// An unstratified parameter ignores `stratum`. A stratified one uses
    /// `stratum`, or the male range when none is given. With no stratum and
    /// no male entry, whichever stratum the catalog carries is used.
    pub fn lookup(
        &self,
        category: Category,
        parameter_name: &str,
        stratum: Option<Stratum>,
    ) -> Result<&ReferenceRange, AnalyticsError> {
        let key = normalize_parameter_name(parameter_name);
        let wanted = stratum.unwrap_or(Stratum::DEFAULT);
        let mut candidates = self
            .ranges
            .iter()
            .filter(|r| r.category == category && r.key() == key);

        let exact = candidates
            .clone()
            .find(|r| r.stratum.is_none() || r.stratum == Some(wanted));
        let found = match (exact, stratum) {
            (Some(range), _) => Some(range),
            (None, None) => candidates.next(),
            (None, Some(_)) => None,
        };

        found.ok_or_else(|| AnalyticsError::CatalogLookupMiss {
                category,
                parameter: parameter_name.to_string(),
            })
    }

    /// Category a parameter belongs to, if any.
    pub fn category_of(&self, parameter_name: &str) -> Option<Category> {
        let key = normalize_parameter_name(parameter_name);
        self.ranges
            .iter()
            .find(|r| r.key() == key)
            .map(|r| r.category)
    }

    pub fn ranges(&self) -> &[ReferenceRange] {
        &self.ranges
    }

    /// Whole table grouped by category, then parameter.
    pub fn list_all(&self) -> BTreeMap<Category, BTreeMap<String, RangeTableEntry>> {
        let mut table: BTreeMap<Category, BTreeMap<String, RangeTableEntry>> = BTreeMap::new();

        for range in &self.ranges {
            let params = table.entry(range.category).or_default();
            let bounds = Bounds {
                min: range.min,
                max: range.max,
            };

            match range.stratum {
                None => {
                    params.insert(
                        range.key(),
                        RangeTableEntry::Uniform {
                            min: range.min,
                            max: range.max,
                            unit: range.unit.clone(),
                        },
                    );
                }
                Some(stratum) => {
                    let entry = params.entry(range.key()).or_insert_with(|| {
                        RangeTableEntry::Stratified {
                            male: None,
                            female: None,
                            unit: range.unit.clone(),
                        }
                    });
                    if let RangeTableEntry::Stratified { male, female, .. } = entry {
                        match stratum {
                            Stratum::Male => *male = Some(bounds),
                            Stratum::Female => *female = Some(bounds),
                        }
                    }
                }
            }
        }

        table
    }
}

impl Default for ReferenceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
