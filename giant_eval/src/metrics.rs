//! Scoring (§8): accuracy / balanced accuracy over a run of predictions,
//! plus a seeded bootstrap estimator (`B=1000` resamples) reporting mean +-
//! standard deviation. Given identical predictions, truths, and seed, the
//! estimator is bit-exact (§8) — it never reaches for `rand::thread_rng`,
//! only a `StdRng` seeded explicitly by the caller.

use giant_core::model::MetricType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Default bootstrap resample count named in §9's glossary entry.
pub const DEFAULT_BOOTSTRAP_ITERATIONS: usize = 1000;

/// One prediction/truth pair scored together; `predicted` is `None` when
/// the Answer Extractor couldn't resolve a label (§7: "extraction failures
/// produce `predicted_label = nil`, which counts as incorrect").
#[derive(Debug, Clone, Copy)]
pub struct ScoredItem {
	pub predicted: Option<i64>,
	pub truth: i64,
}

/// The fraction of `items` whose prediction matches its truth label.
/// Unresolved (`None`) predictions always count as incorrect.
#[must_use]
pub fn accuracy(items: &[ScoredItem]) -> f64 {
	if items.is_empty() {
		return 0.0;
	}
	let correct = items.iter().filter(|item| item.predicted == Some(item.truth)).count();
	correct as f64 / items.len() as f64
}

/// The unweighted mean of per-class recall: for every distinct truth
/// label, the fraction of its items correctly predicted, averaged across
/// labels regardless of how many items each one has. Classes with zero
/// items never occur since they're derived from `items` itself.
#[must_use]
pub fn balanced_accuracy(items: &[ScoredItem]) -> f64 {
	if items.is_empty() {
		return 0.0;
	}
	let mut per_class: BTreeMap<i64, (usize, usize)> = BTreeMap::new();
	for item in items {
		let entry = per_class.entry(item.truth).or_insert((0, 0));
		entry.1 += 1;
		if item.predicted == Some(item.truth) {
			entry.0 += 1;
		}
	}
	let recalls: Vec<f64> = per_class.values().map(|&(correct, total)| correct as f64 / total as f64).collect();
	recalls.iter().sum::<f64>() / recalls.len() as f64
}

/// Scores `items` by whichever metric `metric_type` names.
#[must_use]
pub fn score(items: &[ScoredItem], metric_type: MetricType) -> f64 {
	match metric_type {
		MetricType::Accuracy => accuracy(items),
		MetricType::BalancedAccuracy => balanced_accuracy(items),
	}
}

/// A resampling-with-replacement estimate: mean and standard deviation of
/// `metric_type` across `iterations` bootstrap resamples of `items`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BootstrapEstimate {
	pub mean: f64,
	pub std_dev: f64,
	pub iterations: usize,
}

/// Runs the bootstrap estimator. Identical `items`, `metric_type`, `seed`,
/// and `iterations` always produce bit-exact output (§8): the only source
/// of randomness is a `StdRng` seeded once up front, never the process-wide
/// thread RNG.
#[must_use]
pub fn bootstrap(items: &[ScoredItem], metric_type: MetricType, seed: u64, iterations: usize) -> BootstrapEstimate {
	if items.is_empty() {
		return BootstrapEstimate { mean: 0.0, std_dev: 0.0, iterations };
	}
	let mut rng = StdRng::seed_from_u64(seed);
	let mut samples = Vec::with_capacity(iterations);
	for _ in 0..iterations {
		let resample: Vec<ScoredItem> = (0..items.len()).map(|_| items[rng.random_range(0..items.len())]).collect();
		samples.push(score(&resample, metric_type));
	}
	let mean = samples.iter().sum::<f64>() / samples.len() as f64;
	let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;
	BootstrapEstimate { mean, std_dev: variance.sqrt(), iterations }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn items(pairs: &[(Option<i64>, i64)]) -> Vec<ScoredItem> {
		pairs.iter().map(|&(predicted, truth)| ScoredItem { predicted, truth }).collect()
	}

	#[test]
	fn accuracy_counts_exact_matches() {
		let items = items(&[(Some(1), 1), (Some(2), 1), (Some(3), 3)]);
		assert!((accuracy(&items) - 2.0 / 3.0).abs() < 1e-9);
	}

	#[test]
	fn unresolved_prediction_counts_as_incorrect() {
		let items = items(&[(None, 1), (Some(1), 1)]);
		assert!((accuracy(&items) - 0.5).abs() < 1e-9);
	}

	#[test]
	fn balanced_accuracy_weights_classes_equally() {
		// Class 1 has 3 items (2 correct), class 2 has 1 item (0 correct).
		// Balanced accuracy = mean(2/3, 0/1) = 1/3, vs raw accuracy 2/4 = 0.5.
		let items = items(&[(Some(1), 1), (Some(1), 1), (Some(2), 1), (Some(1), 2)]);
		assert!((balanced_accuracy(&items) - (2.0 / 3.0 + 0.0) / 2.0).abs() < 1e-9);
		assert!((accuracy(&items) - 0.5).abs() < 1e-9);
	}

	#[test]
	fn empty_items_score_as_zero_not_nan() {
		assert_eq!(accuracy(&[]), 0.0);
		assert_eq!(balanced_accuracy(&[]), 0.0);
	}

	#[test]
	fn bootstrap_is_bit_exact_for_the_same_seed() {
		let items = items(&[(Some(1), 1), (Some(2), 1), (Some(1), 2), (Some(2), 2)]);
		let first = bootstrap(&items, MetricType::Accuracy, 42, 200);
		let second = bootstrap(&items, MetricType::Accuracy, 42, 200);
		assert_eq!(first, second);
	}

	#[test]
	fn bootstrap_differs_across_distinct_seeds_with_enough_items() {
		let items = items(&[(Some(1), 1), (Some(2), 1), (Some(1), 2), (Some(2), 2), (Some(1), 1), (Some(2), 2)]);
		let a = bootstrap(&items, MetricType::Accuracy, 1, 500);
		let b = bootstrap(&items, MetricType::Accuracy, 2, 500);
		assert_ne!(a, b);
	}

	#[test]
	fn bootstrap_mean_tracks_the_point_estimate() {
		let items = items(&[(Some(1), 1), (Some(1), 1), (Some(1), 1), (Some(2), 1)]);
		let estimate = bootstrap(&items, MetricType::Accuracy, 7, DEFAULT_BOOTSTRAP_ITERATIONS);
		assert!((estimate.mean - 0.75).abs() < 0.1);
	}
}
