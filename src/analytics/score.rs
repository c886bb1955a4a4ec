use std::collections::BTreeMap;

use super::reference::ReferenceCatalog;
use super::types::{ensure_finite, AnalyticsError, HealthScore};
use crate::models::{Category, Observation, Stratum};

/// Mean range ratio over the observations the catalog knows in `category`.
/// `None` when no observation matches.
pub fn category_score(
    observations: &[Observation],
    category: Category,
    catalog: &ReferenceCatalog,
    stratum: Option<Stratum>,
) -> Option<f64> {
    let ratios: Vec<f64> = observations
        .iter()
        .filter_map(|o| {
            catalog
                .lookup(category, &o.parameter_name, stratum)
                .ok()
                .map(|range| range.score_ratio(o.value))
        })
        .collect();

    if ratios.is_empty() {
        None
    } else {
        Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
    }
}

/// Weighted composite of the category sub-scores, scaled to `[0, 100]` and
/// rounded to two decimals. Categories without matches drop out of both the
/// numerator and the weight total.
pub fn health_score(
    observations: &[Observation],
    catalog: &ReferenceCatalog,
    stratum: Option<Stratum>,
) -> Result<HealthScore, AnalyticsError> {
    for obs in observations {
        ensure_finite(&obs.parameter_name, &[obs.value])?;
    }

    let category_scores: BTreeMap<Category, f64> = Category::ALL
        .iter()
        .filter_map(|category| {
            category_score(observations, *category, catalog, stratum).map(|s| (*category, s))
        })
        .collect();

    if category_scores.is_empty() {
        tracing::debug!(observations = observations.len(), "No scoreable observations");
        return Ok(HealthScore::not_computable());
    }

    let weighted: f64 = category_scores.iter().map(|(c, s)| c.weight() * s).sum();
    let weight_total: f64 = category_scores.keys().map(Category::weight).sum();
    let value = round2(weighted / weight_total * 100.0);

    tracing::debug!(
        categories = category_scores.len(),
        value,
        "Health score computed"
    );

    Ok(HealthScore {
        value,
        computable: true,
        category_scores,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
