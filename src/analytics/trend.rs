use chrono::{DateTime, Duration, Utc};

use super::reference::ReferenceCatalog;
use super::stats::SeriesStats;
use super::types::{ensure_finite, AnalyticsError, SeriesPoint, TrendOutcome, TrendResult};
use crate::models::{Observation, ParameterSeries, Timeframe, TrendDirection};

/// Percent change beyond which a series counts as moving.
pub const DEFAULT_TREND_THRESHOLD_PERCENT: f64 = 5.0;

/// Label the movement between the first and last values.
///
/// Returns the label and the percent change (`None` for a single value).
/// A zero first value has no defined percent change and is an error.
pub fn trend_direction(
    parameter: &str,
    values: &[f64],
    threshold_percent: f64,
) -> Result<(TrendDirection, Option<f64>), AnalyticsError> {
    let (first, last) = match values {
        [] | [_] => return Ok((TrendDirection::Stable, None)),
        [first, .., last] => (*first, *last),
    };

    if first == 0.0 {
        return Err(AnalyticsError::computation(
            parameter,
            "first value in window is zero; percent change is undefined",
        ));
    }

    let mut change = (last - first) / first * 100.0;
    if !change.is_finite() {
        // `last - first` overflowed; the ratio form stays finite.
        change = (last / first - 1.0) * 100.0;
    }
    let direction = if change > threshold_percent {
        TrendDirection::Increasing
    } else if change < -threshold_percent {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    Ok((direction, Some(change)))
}

/// Summarize an already-windowed series.
pub fn summarize(
    series: &ParameterSeries,
    timeframe: Timeframe,
    threshold_percent: f64,
    catalog: &ReferenceCatalog,
) -> Result<TrendResult, AnalyticsError> {
    let values = series.values();
    ensure_finite(series.key(), &values)?;

    let stats = SeriesStats::compute(&values)
        .ok_or_else(|| AnalyticsError::computation(series.key(), "empty series"))?;
    let (direction, change_percent) = trend_direction(series.key(), &values, threshold_percent)?;

    Ok(TrendResult {
        parameter: series.key().to_string(),
        category: catalog.category_of(series.key()),
        unit: series.latest().unit.clone(),
        timeframe,
        count: stats.count,
        mean: stats.mean,
        median: stats.median,
        stddev: stats.std_dev,
        min: stats.min,
        max: stats.max,
        direction,
        change_percent,
        series: series
            .observations()
            .iter()
            .map(|o| SeriesPoint {
                collected_at: o.collected_at,
                value: o.value,
            })
            .collect(),
    })
}

/// Trend of `parameter` over `timeframe`, measured back from `now`.
pub fn calculate_trend(
    observations: &[Observation],
    parameter: &str,
    timeframe: Timeframe,
    now: DateTime<Utc>,
    threshold_percent: f64,
    catalog: &ReferenceCatalog,
) -> Result<TrendOutcome, AnalyticsError> {
    let start = now - Duration::days(timeframe.days());

    let windowed = ParameterSeries::select(parameter, observations)
        .and_then(|series| series.within(start, now));

    let Some(series) = windowed else {
        tracing::debug!(parameter, timeframe = timeframe.as_str(), "No observations in window");
        return Ok(TrendOutcome::no_data(parameter));
    };

    let result = summarize(&series, timeframe, threshold_percent, catalog)?;
    tracing::debug!(
        parameter = series.key(),
        count = result.count,
        direction = result.direction.as_str(),
        "Trend computed"
    );
    Ok(TrendOutcome::Computed(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        now() - Duration::days(days)
    }

    fn direction_of(values: &[f64]) -> TrendDirection {
        trend_direction("x", values, DEFAULT_TREND_THRESHOLD_PERCENT)
            .unwrap()
            .0
    }

    #[test]
    fn direction_labels() {
        assert_eq!(direction_of(&[100.0, 106.0]), TrendDirection::Increasing);
        assert_eq!(direction_of(&[100.0, 94.0]), TrendDirection::Decreasing);
        assert_eq!(direction_of(&[100.0, 102.0]), TrendDirection::Stable);
        assert_eq!(direction_of(&[100.0, 100.0, 100.0]), TrendDirection::Stable);
    }

    #[test]
    fn direction_uses_only_endpoints() {
        assert_eq!(direction_of(&[100.0, 500.0, 1.0, 101.0]), TrendDirection::Stable);
    }

    #[test]
    fn single_value_is_stable_even_when_zero() {
        assert_eq!(direction_of(&[42.0]), TrendDirection::Stable);
        assert_eq!(direction_of(&[0.0]), TrendDirection::Stable);
        let (_, change) = trend_direction("x", &[42.0], 5.0).unwrap();
        assert_eq!(change, None);
    }

    #[test]
    fn zero_baseline_is_computation_error() {
        let err = trend_direction("tsh", &[0.0, 1.2], 5.0).unwrap_err();
        assert!(matches!(err, AnalyticsError::Computation { ref parameter, .. } if parameter == "tsh"));
    }

    #[test]
    fn extreme_endpoints_give_finite_change() {
        let (direction, change) =
            trend_direction("x", &[f64::MAX, -f64::MAX], DEFAULT_TREND_THRESHOLD_PERCENT).unwrap();
        assert_eq!(direction, TrendDirection::Decreasing);
        assert_eq!(change, Some(-200.0));
    }

    #[test]
    fn extreme_window_stats_stay_bounded() {
        let catalog = ReferenceCatalog::builtin();
        let observations = vec![
            Observation::new("ldl", f64::MAX, "mg/dL", days_ago(3)),
            Observation::new("ldl", f64::MAX, "mg/dL", days_ago(2)),
            Observation::new("ldl", -f64::MAX, "mg/dL", days_ago(1)),
        ];
        let outcome =
            calculate_trend(&observations, "ldl", Timeframe::OneYear, now(), 5.0, &catalog).unwrap();
        let result = outcome.computed().unwrap();
        assert!(result.min <= result.mean && result.mean <= result.max);
        assert!(result.min <= result.median && result.median <= result.max);
        assert!(result.stddev.is_finite());
        assert!(result.change_percent.unwrap().is_finite());
    }

    #[test]
    fn calculate_trend_filters_window_and_parameter() {
        let catalog = ReferenceCatalog::builtin();
        let observations = vec![
            Observation::new("Glucose", 300.0, "mg/dL", days_ago(400)),
            Observation::new("glucose", 90.0, "mg/dL", days_ago(20)),
            Observation::new("GLUCOSE", 99.0, "mg/dL", days_ago(5)),
            Observation::new("hdl", 55.0, "mg/dL", days_ago(5)),
        ];

        let outcome = calculate_trend(
            &observations,
            "glucose",
            Timeframe::OneYear,
            now(),
            DEFAULT_TREND_THRESHOLD_PERCENT,
            &catalog,
        )
        .unwrap();

        let result = outcome.computed().unwrap();
        assert_eq!(result.count, 2);
        assert_eq!(result.parameter, "glucose");
        assert_eq!(result.category, Some(Category::Metabolic));
        assert_eq!(result.direction, TrendDirection::Increasing);
        assert_eq!(result.min, 90.0);
        assert_eq!(result.max, 99.0);
        assert_eq!(result.series.len(), 2);
        assert_eq!(result.series[0].value, 90.0);
    }

    #[test]
    fn one_month_window_excludes_older_points() {
        let catalog = ReferenceCatalog::builtin();
        let observations = vec![
            Observation::new("tsh", 1.0, "mIU/L", days_ago(31)),
            Observation::new("tsh", 2.0, "mIU/L", days_ago(30)),
            Observation::new("tsh", 3.0, "mIU/L", days_ago(1)),
        ];
        let outcome = calculate_trend(
            &observations,
            "tsh",
            Timeframe::OneMonth,
            now(),
            DEFAULT_TREND_THRESHOLD_PERCENT,
            &catalog,
        )
        .unwrap();
        assert_eq!(outcome.computed().unwrap().count, 2);
    }

    #[test]
    fn future_observations_are_excluded() {
        let catalog = ReferenceCatalog::builtin();
        let observations = vec![Observation::new("tsh", 2.0, "mIU/L", now() + Duration::days(1))];
        let outcome = calculate_trend(&observations, "tsh", Timeframe::OneYear, now(), 5.0, &catalog)
            .unwrap();
        assert_eq!(outcome, TrendOutcome::no_data("tsh"));
    }

    #[test]
    fn empty_window_is_no_data_not_error() {
        let catalog = ReferenceCatalog::builtin();
        let outcome = calculate_trend(&[], "ldl", Timeframe::SixMonths, now(), 5.0, &catalog).unwrap();
        assert!(matches!(outcome, TrendOutcome::NoData { .. }));
    }

    #[test]
    fn non_finite_value_is_computation_error() {
        let catalog = ReferenceCatalog::builtin();
        let observations = vec![
            Observation::new("ldl", 90.0, "mg/dL", days_ago(3)),
            Observation::new("ldl", f64::INFINITY, "mg/dL", days_ago(2)),
        ];
        let result = calculate_trend(&observations, "ldl", Timeframe::OneYear, now(), 5.0, &catalog);
        assert!(matches!(result, Err(AnalyticsError::Computation { .. })));
    }

    #[test]
    fn unknown_parameter_has_no_category() {
        let catalog = ReferenceCatalog::builtin();
        let observations = vec![Observation::new("ferritin", 80.0, "ng/mL", days_ago(3))];
        let outcome =
            calculate_trend(&observations, "Ferritin", Timeframe::OneYear, now(), 5.0, &catalog)
                .unwrap();
        let result = outcome.computed().unwrap();
        assert_eq!(result.category, None);
        assert_eq!(result.direction, TrendDirection::Stable);
        assert_eq!(result.unit, "ng/mL");
    }
}
