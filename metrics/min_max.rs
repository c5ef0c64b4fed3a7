use crate::StreamingMetric;

/// Streaming minimum and maximum. NaN inputs are ignored.
#[derive(Clone, Debug, Default)]
pub struct MinMax(Option<(f64, f64)>);

impl StreamingMetric<'_> for MinMax {
	type Input = f64;
	type Output = Option<(f64, f64)>;

	fn update(&mut self, value: f64) {
		if value.is_nan() {
			return;
		}
		self.0 = match self.0 {
			Some((min, max)) => Some((min.min(value), max.max(value))),
			None => Some((value, value)),
		};
	}

	fn merge(&mut self, other: Self) {
		if let Some((min, max)) = other.0 {
			self.update(min);
			self.update(max);
		}
	}

	fn finalize(self) -> Self::Output {
		self.0
	}
}

#[test]
fn test_min_max() {
	let mut metric = MinMax::default();
	for value in &[3.0, f64::NAN, -2.0, 7.5] {
		metric.update(*value);
	}
	insta::assert_debug_snapshot!(metric.finalize(), @r###"
 Some(
     (
         -2.0,
         7.5,
     ),
 )
 "###);
}
