/*!
This module defines row filters. A row passes a filter if the filter is disabled, or if its predicate holds, or does not hold for an inverted filter. A row is filtered in only if it passes every filter.
*/

use crate::state::RowSet;
use fnv::FnvHashSet;
use spotlight_dataframe::{DataFrame, ScalarValue};
use std::{
	any::Any,
	cmp::Ordering,
	fmt::Debug,
	panic::{catch_unwind, AssertUnwindSafe},
	sync::{
		atomic::{AtomicU64, Ordering as AtomicOrdering},
		Arc,
	},
};

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
	#[error("unknown column {0:?}")]
	UnknownColumn(String),
	#[error("cannot compare {value} with {reference}")]
	Incomparable {
		value: ScalarValue,
		reference: ScalarValue,
	},
	#[error("{0}")]
	Other(String),
}

pub trait Predicate: Debug + Send + Sync {
	fn apply(&self, row: usize, data: &DataFrame) -> Result<bool, FilterError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(u64);

static NEXT_FILTER_ID: AtomicU64 = AtomicU64::new(0);

/// A predicate with its `enabled` and `inverted` flags. Clones share the id of the original.
#[derive(Clone, Debug)]
pub struct Filter {
	id: FilterId,
	pub predicate: Arc<dyn Predicate>,
	pub enabled: bool,
	pub inverted: bool,
}

impl Filter {
	pub fn new(predicate: impl Predicate + 'static) -> Filter {
		Filter {
			id: FilterId(NEXT_FILTER_ID.fetch_add(1, AtomicOrdering::Relaxed)),
			predicate: Arc::new(predicate),
			enabled: true,
			inverted: false,
		}
	}

	pub fn inverted(mut self, inverted: bool) -> Filter {
		self.inverted = inverted;
		self
	}

	pub fn enabled(mut self, enabled: bool) -> Filter {
		self.enabled = enabled;
		self
	}

	pub fn id(&self) -> FilterId {
		self.id
	}

	pub fn passes(&self, row: usize, data: &DataFrame) -> Result<bool, FilterError> {
		if !self.enabled {
			return Ok(true);
		}
		let result = self.predicate.apply(row, data)?;
		Ok(result != self.inverted)
	}
}

/// A filter that failed on some row.
#[derive(Debug)]
pub struct BrokenFilter {
	pub id: FilterId,
	pub row: usize,
	pub error: FilterError,
}

/// Evaluate every filter on every row. Broken filters, including filters whose predicate panicked, are returned separately and left out of the result.
pub fn compute_filtered(
	filters: &[Filter],
	data: &DataFrame,
	length: usize,
) -> (RowSet, Vec<BrokenFilter>) {
	let mut mask = vec![true; length];
	let mut broken = Vec::new();
	for filter in filters.iter().filter(|filter| filter.enabled) {
		let mut row = 0;
		let passes = catch_unwind(AssertUnwindSafe(|| -> Result<Vec<bool>, FilterError> {
			let mut passes = Vec::with_capacity(length);
			while row < length {
				passes.push(filter.passes(row, data)?);
				row += 1;
			}
			Ok(passes)
		}))
		.unwrap_or_else(|payload| Err(FilterError::Other(panic_message(payload.as_ref()))));
		match passes {
			Ok(passes) => {
				for (included, passes) in mask.iter_mut().zip(passes) {
					*included = *included && passes;
				}
			}
			Err(error) => broken.push(BrokenFilter {
				id: filter.id,
				row,
				error,
			}),
		}
	}
	(RowSet::from_mask(mask), broken)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		format!("filter panicked: {}", message)
	} else if let Some(message) = payload.downcast_ref::<String>() {
		format!("filter panicked: {}", message)
	} else {
		"filter panicked".to_owned()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
	/// Substring match on strings.
	Contains,
}

/// Compares the value of `column` with `reference`. Missing values never match.
#[derive(Clone, Debug)]
pub struct PredicateFilter {
	pub column: String,
	pub op: FilterOp,
	pub reference: ScalarValue,
}

impl PredicateFilter {
	pub fn new(column: impl Into<String>, op: FilterOp, reference: ScalarValue) -> PredicateFilter {
		PredicateFilter {
			column: column.into(),
			op,
			reference,
		}
	}
}

impl Predicate for PredicateFilter {
	fn apply(&self, row: usize, data: &DataFrame) -> Result<bool, FilterError> {
		let column = data
			.get(&self.column)
			.ok_or_else(|| FilterError::UnknownColumn(self.column.clone()))?;
		let value = match column.scalar_at(row) {
			Some(value) => value,
			None => return Ok(false),
		};
		let incomparable = || FilterError::Incomparable {
			value: value.clone(),
			reference: self.reference.clone(),
		};
		let ordering = || value.compare(&self.reference).ok_or_else(incomparable);
		let result = match self.op {
			FilterOp::Eq => ordering()? == Ordering::Equal,
			FilterOp::Ne => ordering()? != Ordering::Equal,
			FilterOp::Lt => ordering()? == Ordering::Less,
			FilterOp::Le => ordering()? != Ordering::Greater,
			FilterOp::Gt => ordering()? == Ordering::Greater,
			FilterOp::Ge => ordering()? != Ordering::Less,
			FilterOp::Contains => match (value.as_str(), self.reference.as_str()) {
				(Some(value), Some(reference)) => value.contains(reference),
				_ => return Err(incomparable()),
			},
		};
		Ok(result)
	}
}

/// Matches a fixed set of rows, such as a selection turned into a filter.
#[derive(Clone, Debug, Default)]
pub struct SetFilter {
	pub rows: FnvHashSet<usize>,
}

impl SetFilter {
	pub fn new(rows: impl IntoIterator<Item = usize>) -> SetFilter {
		SetFilter {
			rows: rows.into_iter().collect(),
		}
	}
}

impl Predicate for SetFilter {
	fn apply(&self, row: usize, _: &DataFrame) -> Result<bool, FilterError> {
		Ok(self.rows.contains(&row))
	}
}

#[cfg(test)]
fn test_data() -> DataFrame {
	use maplit::btreemap;
	use spotlight_dataframe::ColumnData;
	DataFrame::from_columns(btreemap! {
		"col".to_owned() => ColumnData::Int(vec![Some(5), Some(3), Some(5), None]),
		"name".to_owned() => ColumnData::Str(vec!["apple".to_owned(), "pear".to_owned(), "grape".to_owned(), String::new()]),
	})
}

#[test]
fn test_filters_are_anded() {
	let data = test_data();
	let equal = Filter::new(PredicateFilter::new("col", FilterOp::Eq, ScalarValue::Int(5)));
	let (filtered, broken) = compute_filtered(&[equal.clone()], &data, 4);
	assert!(broken.is_empty());
	assert_eq!(filtered.indices(), &[0, 2]);
	let contains = Filter::new(PredicateFilter::new(
		"name",
		FilterOp::Contains,
		ScalarValue::Str("ap".to_owned()),
	));
	let (filtered, _) = compute_filtered(&[equal.clone(), contains], &data, 4);
	assert_eq!(filtered.indices(), &[0, 2]);
	let rows = Filter::new(SetFilter::new(vec![2, 3]));
	let (filtered, _) = compute_filtered(&[equal, rows], &data, 4);
	assert_eq!(filtered.indices(), &[2]);
}

#[test]
fn test_contradictory_filters_filter_everything() {
	let data = test_data();
	let equal = Filter::new(PredicateFilter::new("col", FilterOp::Eq, ScalarValue::Int(5)));
	let inverted = Filter::new(PredicateFilter::new("col", FilterOp::Eq, ScalarValue::Int(5))).inverted(true);
	let (filtered, broken) = compute_filtered(&[equal, inverted.clone()], &data, 4);
	assert!(broken.is_empty());
	assert!(filtered.is_empty());
	let (filtered, _) = compute_filtered(&[inverted.clone().enabled(false)], &data, 4);
	assert_eq!(filtered.indices(), &[0, 1, 2, 3]);
	// Missing values fail the predicate, so an inverted filter lets them through.
	let (filtered, _) = compute_filtered(&[inverted], &data, 4);
	assert_eq!(filtered.indices(), &[1, 3]);
}

#[test]
fn test_broken_filters_are_reported() {
	let data = test_data();
	let missing = Filter::new(PredicateFilter::new("nope", FilterOp::Eq, ScalarValue::Int(1)));
	let mismatched = Filter::new(PredicateFilter::new(
		"name",
		FilterOp::Lt,
		ScalarValue::Int(1),
	));
	let fine = Filter::new(PredicateFilter::new("col", FilterOp::Ge, ScalarValue::Int(4)));
	let (filtered, broken) = compute_filtered(&[missing.clone(), mismatched.clone(), fine], &data, 4);
	assert_eq!(filtered.indices(), &[0, 2]);
	let ids: Vec<FilterId> = broken.iter().map(|broken| broken.id).collect();
	assert_eq!(ids, vec![missing.id(), mismatched.id()]);
	insta::assert_debug_snapshot!(broken[1].error.to_string(), @r###""cannot compare apple with 1""###);
}

#[cfg(test)]
#[derive(Debug)]
pub struct PanicsOnRow(pub usize);

#[cfg(test)]
impl Predicate for PanicsOnRow {
	fn apply(&self, row: usize, _: &DataFrame) -> Result<bool, FilterError> {
		if row == self.0 {
			panic!("row {}", row);
		}
		Ok(true)
	}
}

#[test]
fn test_panicking_filter_is_broken() {
	let data = test_data();
	let panics = Filter::new(PanicsOnRow(2));
	let fine = Filter::new(PredicateFilter::new("col", FilterOp::Eq, ScalarValue::Int(5)));
	let (filtered, broken) = compute_filtered(&[panics.clone(), fine], &data, 4);
	assert_eq!(filtered.indices(), &[0, 2]);
	assert_eq!(broken.len(), 1);
	assert_eq!(broken[0].id, panics.id());
	assert_eq!(broken[0].row, 2);
	insta::assert_debug_snapshot!(broken[0].error.to_string(), @r###""filter panicked: row 2""###);
}
