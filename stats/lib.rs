/*!
This crate computes summary statistics for numeric columns, optionally restricted to the rows of a boolean mask.

Quantiles use linear interpolation between closest ranks: for sorted values `x[0..n]` and quantile `p`, let `h = (n - 1) * p`, then `q = x[floor(h)] + fract(h) * (x[floor(h) + 1] - x[floor(h)])`. This is Hyndman and Fan's definition 7, the default of numpy and R.
*/

#![allow(clippy::tabs_in_doc_comments)]

use num_traits::ToPrimitive;
use rayon::prelude::*;
use spotlight_dataframe::{Column, ColumnData, DataFrame, DataType};
use ordered_float::NotNan;
use spotlight_metrics::{MeanVariance, StreamingMetric};
use std::{cmp::Ordering, collections::BTreeMap};

mod histogram;

pub use self::histogram::BinnedHistogram;

/// Summary statistics of the non-missing values of a numeric column.
#[derive(Clone, Debug, PartialEq)]
pub struct DataStatistics {
	pub min: f64,
	pub max: f64,
	pub mean: f64,
	/// Population standard deviation.
	pub std: f64,
	pub p5: f64,
	pub p95: f64,
}

/// Maps column keys to their stats. A column without stats has no entry.
pub type StatsMap = BTreeMap<String, DataStatistics>;

/// Compute stats for `data` over the rows where `mask` is true, or over all rows if there is no mask. Rows past the end of the mask count as included.
///
/// Returns `None` if `data_type` is not numeric or no non-missing values remain.
pub fn compute_stats(
	data_type: &DataType,
	data: &ColumnData,
	mask: Option<&[bool]>,
) -> Option<DataStatistics> {
	if !data_type.is_numeric() {
		return None;
	}
	// Count each unique value. Walking the sorted histogram is O(n_unique_values) instead of sorting O(n_rows) values.
	let mut histogram: BTreeMap<NotNan<f64>, usize> = BTreeMap::new();
	let mut valid_count = 0;
	for row in 0..data.len() {
		let included = mask.and_then(|mask| mask.get(row).copied()).unwrap_or(true);
		if !included {
			continue;
		}
		if let Some(value) = data.numeric_at(row).and_then(|value| NotNan::new(value).ok()) {
			*histogram.entry(value).or_insert(0) += 1;
			valid_count += 1;
		}
	}
	if valid_count == 0 {
		return None;
	}
	Some(compute_number_stats(&histogram, valid_count))
}

/// Compute stats for every numeric column. Columns whose stats are unavailable are absent from the result.
pub fn compute_columns_stats(
	columns: &[Column],
	data: &DataFrame,
	mask: Option<&[bool]>,
) -> StatsMap {
	columns
		.par_iter()
		.filter_map(|column| {
			let column_data = data.get(&column.key)?;
			let stats = compute_stats(&column.data_type, column_data, mask)?;
			Some((column.key.clone(), stats))
		})
		.collect()
}

fn compute_number_stats(
	histogram: &BTreeMap<NotNan<f64>, usize>,
	total_values_count: usize,
) -> DataStatistics {
	let min = histogram
		.keys()
		.next()
		.map(|value| value.into_inner())
		.unwrap_or(0.0);
	let max = histogram
		.keys()
		.next_back()
		.map(|value| value.into_inner())
		.unwrap_or(0.0);
	let total_values_count = total_values_count.to_f64().unwrap();
	let quantiles: [f64; 2] = [0.05, 0.95];
	// Find the index of each quantile given the total number of values.
	let quantile_indexes: Vec<usize> = quantiles
		.iter()
		.map(|q| ((total_values_count - 1.0) * q).trunc().to_usize().unwrap())
		.collect();
	// This is the fractional part of the index used to interpolate values if the index is not an integer value.
	let quantile_fracts: Vec<f64> = quantiles
		.iter()
		.map(|q| ((total_values_count - 1.0) * q).fract())
		.collect();
	let mut quantiles: Vec<Option<f64>> = vec![None; quantiles.len()];
	let mut current_count: usize = 0;
	let mut mean_variance = MeanVariance::default();
	let mut iter = histogram.iter().peekable();
	while let Some((value, count)) = iter.next() {
		let value = value.into_inner();
		mean_variance.merge(MeanVariance::repeated(value, count.to_u64().unwrap()));
		current_count += count;
		let quantiles_iter = quantiles
			.iter_mut()
			.zip(quantile_indexes.iter().zip(quantile_fracts.iter()))
			.filter(|(q, (_, _))| q.is_none());
		for (quantile, (index, fract)) in quantiles_iter {
			match (current_count - 1).cmp(index) {
				Ordering::Equal => {
					if *fract > 0.0 {
						// Interpolate between this value and the next unique value.
						let next_value = iter
							.peek()
							.map(|(next, _)| next.into_inner())
							.unwrap_or(value);
						*quantile = Some(interpolate(value, next_value, *fract));
					} else {
						*quantile = Some(value);
					}
				}
				Ordering::Greater => *quantile = Some(value),
				Ordering::Less => {}
			}
		}
	}
	let (mean, variance) = mean_variance
		.finalize()
		.map(|output| (output.mean, output.variance))
		.unwrap_or((0.0, 0.0));
	DataStatistics {
		min,
		max,
		mean,
		std: variance.sqrt(),
		p5: quantiles[0].unwrap_or(min),
		p95: quantiles[1].unwrap_or(max),
	}
}

/// Linear interpolation from `a` to `b`. An infinite end gives an infinite result.
fn interpolate(a: f64, b: f64, fract: f64) -> f64 {
	if a == b {
		a
	} else {
		a * (1.0 - fract) + b * fract
	}
}

#[cfg(test)]
fn assert_close(left: f64, right: f64) {
	assert!((left - right).abs() < 1e-9, "{} != {}", left, right);
}

#[test]
fn test_compute_stats_one_to_ten() {
	let data = ColumnData::Float((1..=10).map(|value| value as f64).collect());
	let stats = compute_stats(&DataType::Float, &data, None).unwrap();
	assert_eq!(stats.min, 1.0);
	assert_eq!(stats.max, 10.0);
	assert_eq!(stats.mean, 5.5);
	assert_close(stats.std, 8.25f64.sqrt());
	assert_close(stats.p5, 1.45);
	assert_close(stats.p95, 9.55);
}

#[test]
fn test_compute_stats_one() {
	let data = ColumnData::Int(vec![Some(1)]);
	let stats = compute_stats(&DataType::Int, &data, None).unwrap();
	assert_eq!(
		stats,
		DataStatistics {
			min: 1.0,
			max: 1.0,
			mean: 1.0,
			std: 0.0,
			p5: 1.0,
			p95: 1.0,
		}
	);
}

#[test]
fn test_compute_stats_repeated_values() {
	let data = ColumnData::Int(vec![Some(1), Some(2), Some(1), None, Some(1)]);
	let stats = compute_stats(&DataType::Int, &data, None).unwrap();
	assert_eq!(stats.mean, 1.25);
	assert_close(stats.std, 0.1875f64.sqrt());
	assert_close(stats.p5, 1.0);
	assert_close(stats.p95, 1.85);
}

#[test]
fn test_compute_stats_respects_mask() {
	let data = ColumnData::Float(vec![1.0, 100.0, 3.0]);
	let stats = compute_stats(&DataType::Float, &data, Some(&[true, false, true])).unwrap();
	assert_eq!(stats.min, 1.0);
	assert_eq!(stats.max, 3.0);
	assert_eq!(stats.mean, 2.0);
	assert!(compute_stats(&DataType::Float, &data, Some(&[false, false, false])).is_none());
}

#[test]
fn test_compute_stats_all_nan_is_absent() {
	use maplit::btreemap;
	let nan = std::f64::NAN;
	let columns = vec![
		Column::new("empty", DataType::Float),
		Column::new("value", DataType::Float),
		Column::new("name", DataType::Str),
	];
	let data = DataFrame::from_columns(btreemap! {
		"empty".to_owned() => ColumnData::Float(vec![nan, nan, nan]),
		"value".to_owned() => ColumnData::Float(vec![1.0, 2.0, 3.0]),
		"name".to_owned() => ColumnData::Str(vec!["a".to_owned(), "b".to_owned(), "c".to_owned()]),
	});
	assert!(compute_stats(&DataType::Float, data.get("empty").unwrap(), None).is_none());
	let stats = compute_columns_stats(&columns, &data, None);
	assert!(!stats.contains_key("empty"));
	assert!(!stats.contains_key("name"));
	assert!(stats.contains_key("value"));
}

#[test]
fn test_compute_stats_non_numeric() {
	let data = ColumnData::Bool(vec![true, false]);
	assert!(compute_stats(&DataType::Bool, &data, None).is_none());
}

#[test]
fn test_compute_stats_keeps_infinities() {
	let data = ColumnData::Float(vec![1.0, f64::NAN, 2.0, f64::INFINITY]);
	let stats = compute_stats(&DataType::Float, &data, None).unwrap();
	assert_eq!(stats.min, 1.0);
	assert_eq!(stats.max, f64::INFINITY);
	assert_eq!(stats.mean, f64::INFINITY);
	assert_close(stats.p5, 1.1);
	assert_eq!(stats.p95, f64::INFINITY);
	let data = ColumnData::Float(vec![f64::NEG_INFINITY, 0.0]);
	let stats = compute_stats(&DataType::Float, &data, None).unwrap();
	assert_eq!(stats.min, f64::NEG_INFINITY);
	assert_eq!(stats.p5, f64::NEG_INFINITY);
	assert_eq!(stats.max, 0.0);
}
