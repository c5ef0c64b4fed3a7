use rayon::prelude::*;
use spotlight_dataframe::{Column, ColumnData, DataFrame, DataType};
use spotlight_metrics::{MinMax, StreamingMetric};
use spotlight_stats::BinnedHistogram;
use std::{collections::BTreeMap, sync::Arc};

pub const DEFAULT_RELEVANCE_BINS: usize = 5;

/// Coefficients below this are treated as this value, so fully disjoint distributions get a large but finite distance.
const MIN_BHATTACHARYYA_COEFFICIENT: f64 = 1e-12;

/// Distances below this are rounding noise from identical distributions.
const MIN_DISTANCE: f64 = 1e-12;

/// Maps column keys to scores in `[0, 1]`. Skipped columns have no entry.
pub type Relevances = BTreeMap<String, f64>;

/// A snapshot of everything the relevance computation reads.
#[derive(Clone, Debug)]
pub struct RelevanceInput {
	pub columns: Arc<Vec<Column>>,
	pub data: Arc<DataFrame>,
	pub foreground: Arc<Vec<usize>>,
	pub background: Arc<Vec<usize>>,
	pub n_bins: usize,
}

pub fn compute_relevance(input: &RelevanceInput) -> Relevances {
	let distances: Vec<(String, f64)> = input
		.columns
		.par_iter()
		.filter(|column| is_eligible(&column.data_type))
		.filter_map(|column| {
			let data = input.data.get(&column.key)?;
			let distance = column_distance(data, &input.foreground, &input.background, input.n_bins)?;
			Some((column.key.clone(), distance))
		})
		.collect();
	let max_distance = distances
		.iter()
		.fold(0.0f64, |max, (_, distance)| max.max(*distance));
	if max_distance == 0.0 {
		return distances.into_iter().map(|(key, _)| (key, 0.0)).collect();
	}
	distances
		.into_iter()
		.map(|(key, distance)| (key, distance / max_distance))
		.collect()
}

fn is_eligible(data_type: &DataType) -> bool {
	match data_type {
		DataType::Int | DataType::Float | DataType::Bool | DataType::Category { .. } => true,
		DataType::Str
		| DataType::Datetime
		| DataType::Array
		| DataType::Window
		| DataType::Mesh
		| DataType::Image
		| DataType::Audio
		| DataType::Video
		| DataType::Sequence1D
		| DataType::Sequence { .. }
		| DataType::BoundingBox
		| DataType::Embedding
		| DataType::Unknown => false,
	}
}

/// The Bhattacharyya distance between the foreground and background distributions of one column, or `None` if the column has to be skipped.
fn column_distance(
	data: &ColumnData,
	foreground: &[usize],
	background: &[usize],
	n_bins: usize,
) -> Option<f64> {
	let gather = |rows: &[usize]| -> Vec<f64> {
		rows.iter()
			.filter_map(|row| data.numeric_at(*row))
			.collect()
	};
	let foreground = gather(foreground);
	let background = gather(background);
	if foreground.is_empty() || background.is_empty() {
		return None;
	}
	let mut min_max = MinMax::default();
	for value in foreground.iter().chain(background.iter()) {
		min_max.update(*value);
	}
	let (min, max) = min_max.finalize()?;
	let histogram = BinnedHistogram::new(min, max, n_bins);
	let foreground = histogram.normalized_counts(&foreground);
	let background = histogram.normalized_counts(&background);
	let coefficient: f64 = foreground
		.iter()
		.zip(background.iter())
		.map(|(fg, bg)| (fg * bg).sqrt())
		.sum();
	let distance = -coefficient.max(MIN_BHATTACHARYYA_COEFFICIENT).ln();
	if distance < MIN_DISTANCE {
		Some(0.0)
	} else {
		Some(distance)
	}
}

#[cfg(test)]
fn input(
	columns: Vec<Column>,
	data: DataFrame,
	foreground: Vec<usize>,
	background: Vec<usize>,
) -> RelevanceInput {
	RelevanceInput {
		columns: Arc::new(columns),
		data: Arc::new(data),
		foreground: Arc::new(foreground),
		background: Arc::new(background),
		n_bins: DEFAULT_RELEVANCE_BINS,
	}
}

#[test]
fn test_most_distinguishing_column_scores_one() {
	use maplit::btreemap;
	let data = DataFrame::from_columns(btreemap! {
		"split".to_owned() => ColumnData::Float(vec![0.0, 0.0, 0.0, 10.0, 10.0, 10.0]),
		"mixed".to_owned() => ColumnData::Float(vec![0.0, 10.0, 5.0, 0.0, 10.0, 6.0]),
		"name".to_owned() => ColumnData::Str(vec![String::new(); 6]),
	});
	let columns = vec![
		Column::new("split", DataType::Float),
		Column::new("mixed", DataType::Float),
		Column::new("name", DataType::Str),
	];
	let relevances = compute_relevance(&input(columns, data, vec![0, 1, 2], (0..6).collect()));
	assert_eq!(relevances.get("split"), Some(&1.0));
	let mixed = relevances["mixed"];
	assert!(mixed >= 0.0 && mixed < 1.0);
	assert!(!relevances.contains_key("name"));
	for value in relevances.values() {
		assert!(*value >= 0.0 && *value <= 1.0);
	}
}

#[test]
fn test_identical_distributions_score_zero() {
	use maplit::btreemap;
	let data = DataFrame::from_columns(btreemap! {
		"a".to_owned() => ColumnData::Int(vec![Some(1), Some(2), Some(3)]),
		"b".to_owned() => ColumnData::Bool(vec![true, false, true]),
	});
	let columns = vec![Column::new("a", DataType::Int), Column::new("b", DataType::Bool)];
	let relevances = compute_relevance(&input(columns, data, vec![0, 1, 2], vec![0, 1, 2]));
	assert_eq!(relevances.get("a"), Some(&0.0));
	assert_eq!(relevances.get("b"), Some(&0.0));
}

#[test]
fn test_empty_sets_and_missing_values_are_skipped() {
	use maplit::btreemap;
	let nan = std::f64::NAN;
	let data = DataFrame::from_columns(btreemap! {
		"missing".to_owned() => ColumnData::Float(vec![nan, nan, nan]),
		"value".to_owned() => ColumnData::Float(vec![1.0, 2.0, 3.0]),
	});
	let columns = vec![Column::new("missing", DataType::Float), Column::new("value", DataType::Float)];
	let no_foreground = compute_relevance(&input(columns.clone(), data.clone(), vec![], vec![0, 1, 2]));
	assert!(no_foreground.is_empty());
	let relevances = compute_relevance(&input(columns, data, vec![0], vec![0, 1, 2]));
	assert!(!relevances.contains_key("missing"));
	assert_eq!(relevances.get("value"), Some(&1.0));
}
