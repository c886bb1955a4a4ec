//! Univariate outlier models.
//!
//! The anomaly detector only needs a yes/no per point; anything that honours
//! the contamination rate and returns identical flags for identical
//! `(values, contamination, seed)` can stand behind the trait.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::stats::percentile;

/// Flags outliers in a one-dimensional sample.
pub trait UnivariateOutlierDetector: Send + Sync {
    /// One flag per input value, `true` meaning outlier.
    fn classify(&self, values: &[f64], contamination: f64, seed: u64) -> Vec<bool>;
}

/// Isolation forest over scalar values.
///
/// Each tree isolates points with random splits; points that isolate in few
/// splits score high. The `contamination` quantile of the training scores
/// becomes the decision threshold.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    pub tree_count: usize,
    pub max_samples: usize,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self {
            tree_count: 100,
            max_samples: 256,
        }
    }
}

enum Node {
    Leaf { size: usize },
    Split { threshold: f64, left: Box<Node>, right: Box<Node> },
}

impl IsolationForest {
    pub fn new(tree_count: usize, max_samples: usize) -> Self {
        Self {
            tree_count: tree_count.max(1),
            max_samples: max_samples.max(2),
        }
    }

    /// Anomaly score in `(0, 1]` per value; higher is more isolated.
    pub fn score(&self, values: &[f64], seed: u64) -> Vec<f64> {
        let n = values.len();
        if n < 2 {
            return vec![0.5; n];
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let sample_size = self.max_samples.min(n);
        let depth_limit = (sample_size as f64).log2().ceil() as usize;

        let mut path_totals = vec![0.0; n];
        for _ in 0..self.tree_count {
            let sample: Vec<f64> = rand::seq::index::sample(&mut rng, n, sample_size)
                .into_iter()
                .map(|i| values[i])
                .collect();
            let tree = build_tree(sample, 0, depth_limit, &mut rng);
            for (total, value) in path_totals.iter_mut().zip(values) {
                *total += path_length(&tree, *value, 0);
            }
        }

        let normaliser = average_path_length(sample_size);
        path_totals
            .into_iter()
            .map(|total| {
                let expected = total / self.tree_count as f64;
                2f64.powf(-expected / normaliser)
            })
            .collect()
    }
}

impl UnivariateOutlierDetector for IsolationForest {
    fn classify(&self, values: &[f64], contamination: f64, seed: u64) -> Vec<bool> {
        let scores = self.score(values, seed);
        // Work on negated scores so that "outlier" means "below the quantile".
        let negated: Vec<f64> = scores.iter().map(|s| -s).collect();
        let Some(threshold) = percentile(&negated, contamination * 100.0) else {
            return Vec::new();
        };
        negated.iter().map(|s| *s < threshold).collect()
    }
}

fn build_tree(sample: Vec<f64>, depth: usize, depth_limit: usize, rng: &mut StdRng) -> Node {
    let min = sample.iter().copied().fold(f64::INFINITY, f64::min);
    let max = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if depth >= depth_limit || sample.len() <= 1 || min >= max {
        return Node::Leaf { size: sample.len() };
    }

    // Split in [min, max); `<=` keeps both sides non-empty.
    let threshold = split_point(min, max, rng);
    let (left, right): (Vec<f64>, Vec<f64>) = sample.into_iter().partition(|v| *v <= threshold);

    Node::Split {
        threshold,
        left: Box::new(build_tree(left, depth + 1, depth_limit, rng)),
        right: Box::new(build_tree(right, depth + 1, depth_limit, rng)),
    }
}

/// Uniform draw in `[min, max)`. Spans wider than `f64::MAX` are
/// interpolated on halved bounds, which `gen_range` cannot sample.
fn split_point(min: f64, max: f64, rng: &mut StdRng) -> f64 {
    if (max - min).is_finite() {
        return rng.gen_range(min..max);
    }
    let t: f64 = rng.gen();
    let split = (min / 2.0 + t * (max / 2.0 - min / 2.0)) * 2.0;
    if split < max {
        split.max(min)
    } else {
        min
    }
}

fn path_length(node: &Node, value: f64, depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            threshold,
            left,
            right,
        } => {
            let next = if value <= *threshold { left } else { right };
            path_length(next, value, depth + 1)
        }
    }
}

/// Average unsuccessful-search path length in a binary search tree of `n`
/// nodes; corrects leaf depth for the points a leaf still holds.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * harmonic(n - 1.0) - 2.0 * (n - 1.0) / n
        }
    }
}

fn harmonic(n: f64) -> f64 {
    const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
    n.ln() + EULER_GAMMA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolates_a_single_spike() {
        let mut values = vec![10.0; 9];
        values.push(1000.0);
        let flags = IsolationForest::default().classify(&values, 0.1, 42);
        assert_eq!(flags.len(), 10);
        assert!(flags[9]);
        assert!(flags[..9].iter().all(|f| !f));
    }

    #[test]
    fn constant_series_flags_nothing() {
        let flags = IsolationForest::default().classify(&[5.0; 12], 0.1, 42);
        assert!(flags.iter().all(|f| !f));
    }

    #[test]
    fn same_seed_same_flags() {
        let values: Vec<f64> = (0..40).map(|i| ((i * 37) % 17) as f64 + (i as f64) * 0.3).collect();
        let forest = IsolationForest::default();
        assert_eq!(forest.classify(&values, 0.1, 7), forest.classify(&values, 0.1, 7));
        assert_eq!(forest.score(&values, 7), forest.score(&values, 7));
    }

    #[test]
    fn flags_roughly_contamination_share() {
        let values: Vec<f64> = (0..100).map(|i| (i as f64 * 0.61).sin() * 10.0 + 50.0).collect();
        let flags = IsolationForest::default().classify(&values, 0.1, 42);
        let flagged = flags.iter().filter(|f| **f).count();
        assert!(flagged <= 10, "flagged {flagged}");
    }

    #[test]
    fn spike_scores_highest() {
        let values = [4.1, 4.3, 3.9, 4.0, 4.2, 9.7, 4.1];
        let scores = IsolationForest::default().score(&values, 42);
        let top = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(5));
    }

    #[test]
    fn short_input_is_handled() {
        let forest = IsolationForest::default();
        assert!(forest.classify(&[], 0.1, 42).is_empty());
        assert_eq!(forest.classify(&[3.0], 0.1, 42), vec![false]);
    }

    #[test]
    fn extreme_span_is_split_without_panic() {
        let values = [-1e308, 1e308, 0.0, 1.0, 2.0];
        let forest = IsolationForest::default();
        let scores = forest.score(&values, 42);
        assert_eq!(scores.len(), 5);
        assert!(scores.iter().all(|s| s.is_finite() && *s > 0.0 && *s <= 1.0));
        assert_eq!(forest.classify(&values, 0.1, 42).len(), 5);

        let full = [-f64::MAX, f64::MAX, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(forest.classify(&full, 0.1, 7).len(), 6);
    }

    #[test]
    fn split_point_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let split = split_point(-f64::MAX, f64::MAX, &mut rng);
            assert!((-f64::MAX..f64::MAX).contains(&split));
            let split = split_point(2.0, 3.0, &mut rng);
            assert!((2.0..3.0).contains(&split));
        }
    }

    #[test]
    fn average_path_length_known_values() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!((average_path_length(256) - 10.244).abs() < 0.01);
    }
}
