use super::outlier::UnivariateOutlierDetector;
use super::stats::{mean, population_std_dev};
use super::types::{ensure_finite, AnalyticsError, AnomalyFinding};
use crate::models::{group_by_parameter, AnomalySeverity, Observation, ParameterSeries};

/// Fewest observations a parameter needs before it is evaluated.
pub const MIN_HISTORY: usize = 5;
/// Expected outlier share handed to the outlier model.
pub const CONTAMINATION: f64 = 0.1;
/// Fixed seed so repeated queries flag the same points.
pub const DEFAULT_SEED: u64 = 42;

/// Knobs for a detection run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionSettings {
    pub contamination: f64,
    pub min_history: usize,
    pub seed: u64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            contamination: CONTAMINATION,
            min_history: MIN_HISTORY,
            seed: DEFAULT_SEED,
        }
    }
}

/// Grade how far `value` sits from the values recorded before it.
///
/// z > 3 is high, z > 2 medium, anything else low. A flat history with a
/// different value is infinitely far away.
pub fn anomaly_severity(value: f64, prior: &[f64]) -> AnomalySeverity {
    let center = mean(prior);
    let spread = population_std_dev(prior, center);
    let deviation = (value - center).abs();

    let z_score = if spread > 0.0 {
        deviation / spread
    } else if deviation > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    if z_score > 3.0 {
        AnomalySeverity::High
    } else if z_score > 2.0 {
        AnomalySeverity::Medium
    } else {
        AnomalySeverity::Low
    }
}

/// Evaluate the most recent value of one parameter against its history.
pub fn evaluate_series(
    series: &ParameterSeries,
    detector: &dyn UnivariateOutlierDetector,
    settings: &DetectionSettings,
) -> Result<Option<AnomalyFinding>, AnalyticsError> {
    if series.len() < settings.min_history {
        return Ok(None);
    }

    let values = series.values();
    ensure_finite(series.key(), &values)?;

    let flags = detector.classify(&values, settings.contamination, settings.seed);
    if flags.len() != values.len() {
        return Err(AnalyticsError::computation(
            series.key(),
            format!(
                "outlier model returned {} flags for {} values",
                flags.len(),
                values.len()
            ),
        ));
    }

    let latest_flagged = flags.last().copied().unwrap_or(false);
    if !latest_flagged {
        return Ok(None);
    }

    let latest = series.latest();
    let prior = &values[..values.len() - 1];
    Ok(Some(AnomalyFinding {
        parameter: latest.parameter_name.clone(),
        value: latest.value,
        collected_at: latest.collected_at,
        severity: anomaly_severity(latest.value, prior),
    }))
}

/// Flag each parameter whose latest value is an outlier in the user's own
/// history. Parameters with fewer than `min_history` values are skipped.
/// Findings come back ordered by normalized parameter name.
pub fn detect_anomalies(
    observations: &[Observation],
    detector: &dyn UnivariateOutlierDetector,
    settings: &DetectionSettings,
) -> Result<Vec<AnomalyFinding>, AnalyticsError> {
    let grouped = group_by_parameter(observations);
    let mut findings = Vec::new();
    let mut skipped = 0usize;

    for series in grouped.values() {
        if series.len() < settings.min_history {
            skipped += 1;
            continue;
        }
        if let Some(finding) = evaluate_series(series, detector, settings)? {
            findings.push(finding);
        }
    }

    tracing::debug!(
        parameters = grouped.len(),
        skipped,
        findings = findings.len(),
        "Anomaly detection complete"
    );

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::outlier::IsolationForest;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::days(n)
    }

    fn history(name: &str, values: &[f64]) -> Vec<Observation> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation::new(name, *v, "mg/dL", day(i as i64)))
            .collect()
    }

    /// Flags everything; isolates severity logic from the forest.
    struct FlagAll;

    impl UnivariateOutlierDetector for FlagAll {
        fn classify(&self, values: &[f64], _: f64, _: u64) -> Vec<bool> {
            vec![true; values.len()]
        }
    }

    struct WrongLength;

    impl UnivariateOutlierDetector for WrongLength {
        fn classify(&self, _: &[f64], _: f64, _: u64) -> Vec<bool> {
            vec![true]
        }
    }

    #[test]
    fn spike_after_flat_history_is_high() {
        let obs = history(
            "glucose",
            &[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 1000.0],
        );
        let findings =
            detect_anomalies(&obs, &IsolationForest::default(), &DetectionSettings::default())
                .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].parameter, "glucose");
        assert_eq!(findings[0].value, 1000.0);
        assert_eq!(findings[0].collected_at, day(9));
        assert_eq!(findings[0].severity, AnomalySeverity::High);
    }

    #[test]
    fn short_history_is_skipped_however_extreme() {
        let obs = history("tsh", &[1.0, 1.1, 1.2, 9000.0]);
        let findings = detect_anomalies(&obs, &FlagAll, &DetectionSettings::default()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn unflagged_latest_is_not_reported() {
        // Spike in the middle, ordinary latest value.
        let obs = history("ldl", &[90.0, 91.0, 900.0, 92.0, 90.0, 91.0, 90.0, 92.0, 91.0, 90.0]);
        let findings =
            detect_anomalies(&obs, &IsolationForest::default(), &DetectionSettings::default())
                .unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn latest_is_chosen_by_date_not_input_order() {
        let mut obs = history("hdl", &[50.0, 50.0, 50.0, 50.0, 50.0]);
        obs.push(Observation::new("HDL", 52.0, "mg/dL", day(-1)));
        obs.swap(0, 5);
        let findings = detect_anomalies(&obs, &FlagAll, &DetectionSettings::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].collected_at, day(4));
        assert_eq!(findings[0].value, 50.0);
    }

    #[test]
    fn severity_thresholds() {
        let prior = [8.0, 12.0, 8.0, 12.0]; // mean 10, std 2
        assert_eq!(anomaly_severity(13.0, &prior), AnomalySeverity::Low);
        assert_eq!(anomaly_severity(15.0, &prior), AnomalySeverity::Medium);
        assert_eq!(anomaly_severity(16.5, &prior), AnomalySeverity::High);
        assert_eq!(anomaly_severity(3.0, &prior), AnomalySeverity::High);
    }

    #[test]
    fn flat_history_same_value_is_low() {
        assert_eq!(anomaly_severity(7.0, &[7.0, 7.0, 7.0]), AnomalySeverity::Low);
    }

    #[test]
    fn flat_history_any_move_is_high() {
        // Zero prior spread: even a tiny move is infinitely many deviations out.
        let prior = [50.0; 6];
        assert_eq!(anomaly_severity(50.1, &prior), AnomalySeverity::High);
        assert_eq!(anomaly_severity(49.9, &prior), AnomalySeverity::High);
    }

    #[test]
    fn extreme_magnitudes_do_not_panic() {
        let obs = history("glucose", &[-1e308, 1e308, 0.0, 1.0, 2.0]);
        let result =
            detect_anomalies(&obs, &IsolationForest::default(), &DetectionSettings::default());
        assert!(result.is_ok());

        let obs = history("glucose", &[3.0, 4.0, 5.0, 6.0, -f64::MAX, f64::MAX]);
        let findings = detect_anomalies(&obs, &FlagAll, &DetectionSettings::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, AnomalySeverity::High);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mut obs = history("platelets", &[210.0, 250.0, 190.0, 300.0, 220.0, 205.0, 640.0]);
        obs.extend(history("sodium", &[139.0, 140.0, 141.0, 139.5, 158.0]));
        let forest = IsolationForest::default();
        let settings = DetectionSettings::default();
        let first = detect_anomalies(&obs, &forest, &settings).unwrap();
        let second = detect_anomalies(&obs, &forest, &settings).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn findings_are_ordered_by_parameter() {
        let mut obs = history("TSH", &[1.0, 1.0, 1.0, 1.0, 1.0]);
        obs.extend(history("calcium", &[9.0, 9.0, 9.0, 9.0, 9.0]));
        let findings = detect_anomalies(&obs, &FlagAll, &DetectionSettings::default()).unwrap();
        let names: Vec<_> = findings.iter().map(|f| f.parameter.as_str()).collect();
        assert_eq!(names, vec!["calcium", "TSH"]);
    }

    #[test]
    fn non_finite_history_is_computation_error() {
        let obs = history("t4", &[7.0, 7.5, f64::NAN, 8.0, 7.2]);
        let result = detect_anomalies(&obs, &FlagAll, &DetectionSettings::default());
        assert!(matches!(result, Err(AnalyticsError::Computation { .. })));
    }

    #[test]
    fn mismatched_detector_output_is_computation_error() {
        let obs = history("t3", &[100.0, 110.0, 120.0, 130.0, 140.0]);
        let result = detect_anomalies(&obs, &WrongLength, &DetectionSettings::default());
        assert!(matches!(result, Err(AnalyticsError::Computation { .. })));
    }
}
