//! https://en.wikipedia.org/wiki/Algorithms_for_calculating_variance#Parallel_algorithm

use crate::StreamingMetric;
use num_traits::ToPrimitive;

/// combine two separate means and variances into a single mean and variance
/// useful in parallel algorithms
pub fn merge_mean_m2(
	n_a: u64,
	mean_a: f64,
	m2_a: f64,
	n_b: u64,
	mean_b: f64,
	m2_b: f64,
) -> (f64, f64) {
	let n_a = n_a.to_f64().unwrap();
	let n_b = n_b.to_f64().unwrap();
	(
		(((n_a * mean_a) + (n_b * mean_b)) / (n_a + n_b)),
		m2_a + m2_b + (mean_b - mean_a) * (mean_b - mean_a) * (n_a * n_b / (n_a + n_b)),
	)
}

/// Population variance.
pub fn m2_to_variance(m2: f64, n: u64) -> f64 {
	m2 / n.to_f64().unwrap()
}

/// Streaming mean and population variance of `f64` values.
#[derive(Clone, Debug, Default)]
pub struct MeanVariance {
	n: u64,
	mean: f64,
	m2: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeanVarianceOutput {
	pub n: u64,
	pub mean: f64,
	pub variance: f64,
}

impl MeanVariance {
	/// The aggregate of `n` copies of `value`.
	pub fn repeated(value: f64, n: u64) -> Self {
		Self {
			n,
			mean: value,
			m2: 0.0,
		}
	}
}

impl StreamingMetric<'_> for MeanVariance {
	type Input = f64;
	/// `None` until at least one value was seen.
	type Output = Option<MeanVarianceOutput>;

	fn update(&mut self, value: f64) {
		if self.n == 0 {
			self.n = 1;
			self.mean = value;
			self.m2 = 0.0;
			return;
		}
		let (mean, m2) = merge_mean_m2(self.n, self.mean, self.m2, 1, value, 0.0);
		self.n += 1;
		self.mean = mean;
		self.m2 = m2;
	}

	fn merge(&mut self, other: Self) {
		if other.n == 0 {
			return;
		}
		if self.n == 0 {
			*self = other;
			return;
		}
		let (mean, m2) = merge_mean_m2(self.n, self.mean, self.m2, other.n, other.mean, other.m2);
		self.n += other.n;
		self.mean = mean;
		self.m2 = m2;
	}

	fn finalize(self) -> Self::Output {
		if self.n == 0 {
			return None;
		}
		Some(MeanVarianceOutput {
			n: self.n,
			mean: self.mean,
			variance: m2_to_variance(self.m2, self.n),
		})
	}
}

#[test]
fn test_mean_variance() {
	let mut metric = MeanVariance::default();
	for value in 1..=10 {
		metric.update(value as f64);
	}
	let output = metric.finalize().unwrap();
	assert_eq!(output.n, 10);
	assert_eq!(output.mean, 5.5);
	assert!((output.variance - 8.25).abs() < 1e-9);
}

#[test]
fn test_mean_variance_merge_matches_single_pass() {
	let mut a = MeanVariance::default();
	let mut b = MeanVariance::default();
	let mut all = MeanVariance::default();
	for value in &[2.0, 4.0, 4.0, 4.0] {
		a.update(*value);
		all.update(*value);
	}
	for value in &[5.0, 5.0, 7.0, 9.0] {
		b.update(*value);
		all.update(*value);
	}
	a.merge(b);
	let merged = a.finalize().unwrap();
	let all = all.finalize().unwrap();
	assert!((merged.mean - all.mean).abs() < 1e-12);
	assert!((merged.variance - 4.0).abs() < 1e-9);
}

#[test]
fn test_mean_variance_repeated() {
	let mut metric = MeanVariance::repeated(1.0, 3);
	metric.merge(MeanVariance::repeated(2.0, 1));
	let output = metric.finalize().unwrap();
	assert_eq!(output.mean, 1.25);
	assert!((output.variance - 0.1875).abs() < 1e-12);
}

#[test]
fn test_mean_variance_empty() {
	assert_eq!(MeanVariance::default().finalize(), None);
}
