use num_traits::ToPrimitive;

/// Equal width bins over `[min, max]`. Values equal to `max` fall into the last bin and values outside the range are clamped into the first or last bin.
#[derive(Clone, Debug, PartialEq)]
pub struct BinnedHistogram {
	min: f64,
	max: f64,
	n_bins: usize,
}

impl BinnedHistogram {
	pub fn new(min: f64, max: f64, n_bins: usize) -> Self {
		Self {
			min,
			max,
			n_bins: n_bins.max(1),
		}
	}

	pub fn n_bins(&self) -> usize {
		self.n_bins
	}

	/// The index of the bin holding `value`. A zero width range puts everything in the first bin.
	pub fn bin(&self, value: f64) -> usize {
		let width = self.max - self.min;
		if !(width > 0.0) {
			return 0;
		}
		let position = (value - self.min) / width * self.n_bins.to_f64().unwrap();
		if !(position > 0.0) {
			return 0;
		}
		position.floor().to_usize().unwrap_or(usize::MAX).min(self.n_bins - 1)
	}

	/// Bin counts divided by the number of values. NaN values are skipped but still count towards the total.
	pub fn normalized_counts(&self, values: &[f64]) -> Vec<f64> {
		let mut counts = vec![0.0; self.n_bins];
		if values.is_empty() {
			return counts;
		}
		for value in values.iter().filter(|value| !value.is_nan()) {
			counts[self.bin(*value)] += 1.0;
		}
		let total = values.len().to_f64().unwrap();
		for count in counts.iter_mut() {
			*count /= total;
		}
		counts
	}

	/// The `n_bins + 1` bin edges from `min` to `max`.
	pub fn edges(&self) -> Vec<f64> {
		let n_bins = self.n_bins.to_f64().unwrap();
		(0..=self.n_bins)
			.map(|i| self.min + (self.max - self.min) * i.to_f64().unwrap() / n_bins)
			.collect()
	}
}

#[test]
fn test_bins() {
	let histogram = BinnedHistogram::new(0.0, 10.0, 5);
	assert_eq!(histogram.bin(0.0), 0);
	assert_eq!(histogram.bin(1.99), 0);
	assert_eq!(histogram.bin(2.0), 1);
	assert_eq!(histogram.bin(10.0), 4);
	assert_eq!(histogram.bin(-3.0), 0);
	assert_eq!(histogram.bin(30.0), 4);
	assert_eq!(histogram.edges(), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
}

#[test]
fn test_normalized_counts() {
	let histogram = BinnedHistogram::new(0.0, 4.0, 2);
	assert_eq!(
		histogram.normalized_counts(&[0.0, 1.0, 3.0, 4.0]),
		vec![0.5, 0.5]
	);
	let constant = BinnedHistogram::new(1.0, 1.0, 5);
	assert_eq!(
		constant.normalized_counts(&[1.0, 1.0]),
		vec![1.0, 0.0, 0.0, 0.0, 0.0]
	);
}
