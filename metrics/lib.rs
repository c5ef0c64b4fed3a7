/*!
This crate defines the [`StreamingMetric`](trait.StreamingMetric.html) trait and the streaming aggregates the statistics engine is built from, [`MeanVariance`](struct.MeanVariance.html) and [`MinMax`](struct.MinMax.html).
*/

#![allow(clippy::tabs_in_doc_comments)]

mod mean_variance;
mod min_max;

pub use self::mean_variance::{m2_to_variance, merge_mean_m2, MeanVariance, MeanVarianceOutput};
pub use self::min_max::MinMax;

/**
The `StreamingMetric` trait defines a common interface to metrics that can be computed in a streaming manner, where the input is available one value or one chunk at a time.

After being initialized, a value of type `T` implementing the `StreamingMetric` trait can have `update()` called on it with values of the associated type `Input`. Multiple values of `T` can be merged together by calling `merge()`, which is how per-thread partial results are combined. When finished aggregating, call `finalize()` to produce the associated type `Output`.

# Examples

```
use spotlight_metrics::StreamingMetric;

struct Sum(f64);

impl StreamingMetric<'_> for Sum {
	type Input = f64;
	type Output = f64;
	fn update(&mut self, input: Self::Input) { self.0 += input }
	fn merge(&mut self, other: Self) { self.0 += other.0 }
	fn finalize(self) -> Self::Output { self.0 }
}
```

The generic lifetime `'a` allows `Input`s to borrow from their enclosing scope.
*/
pub trait StreamingMetric<'a> {
	/// `Input` is the type to aggregate in calls to `update()`.
	type Input;
	/// `Output` is the return type of `finalize()`.
	type Output;
	/// Update this streaming metric with the `Input` `input`.
	fn update(&mut self, input: Self::Input);
	/// Merge multiple independently computed streaming metrics.
	fn merge(&mut self, other: Self);
	/// When you are done aggregating `Input`s, call `finalize()` to produce an `Output`.
	fn finalize(self) -> Self::Output;
}
