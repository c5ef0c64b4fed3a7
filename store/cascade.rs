/*!
This module keeps the derived fields of a [`DatasetState`](../state/struct.DatasetState.html) consistent with its inputs.

```text
filters, column data, length -> filtered rows -> filtered stats
selected rows                -> selected stats
column data                  -> full stats
filtered rows, selected rows -> relevance (on the worker)
column data, filtered rows, color preferences -> color transfer functions
```

A mutation records which inputs it changed in a [`Dirty`](struct.Dirty.html) and [`settle`](fn.settle.html) recomputes their dependents in the order above, before the state is committed.
*/

use crate::{
	filter::{compute_filtered, BrokenFilter},
	state::{ColumnStatsTables, ColumnTransferFunctions, DatasetState},
};
use spotlight_colors::{create_color_transfer_function, ColorPreferences};
use spotlight_stats::compute_columns_stats;
use std::{collections::BTreeMap, sync::Arc};

/// The inputs a mutation changed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dirty {
	pub data: bool,
	pub filters: bool,
	pub selection: bool,
	pub colors: bool,
}

impl Dirty {
	pub fn all() -> Dirty {
		Dirty {
			data: true,
			filters: true,
			selection: true,
			colors: true,
		}
	}

	pub fn filters() -> Dirty {
		Dirty {
			filters: true,
			..Default::default()
		}
	}

	pub fn selection() -> Dirty {
		Dirty {
			selection: true,
			..Default::default()
		}
	}

	pub fn colors() -> Dirty {
		Dirty {
			colors: true,
			..Default::default()
		}
	}
}

/// What the store has to do after committing a settled state.
#[derive(Debug, Default)]
pub struct Settled {
	pub broken_filters: Vec<BrokenFilter>,
	/// The relevance inputs changed.
	pub relevance_stale: bool,
}

pub fn settle(state: &mut DatasetState, dirty: Dirty, preferences: &ColorPreferences) -> Settled {
	let mut settled = Settled::default();
	let mut filtered_changed = false;
	if dirty.data || dirty.filters {
		log::debug!("recomputing filtered rows");
		let (filtered, broken_filters) =
			compute_filtered(&state.filters, &state.column_data, state.length);
		if !broken_filters.is_empty() {
			let filters = state
				.filters
				.iter()
				.filter(|filter| !broken_filters.iter().any(|broken| broken.id == filter.id()))
				.cloned()
				.collect();
			state.filters = Arc::new(filters);
		}
		filtered_changed = *state.filtered != filtered;
		state.filtered = Arc::new(filtered);
		settled.broken_filters = broken_filters;
	}
	let ColumnStatsTables {
		full,
		filtered,
		selected,
	} = &mut state.column_stats;
	if dirty.data {
		log::debug!("recomputing full stats");
		*full = Arc::new(compute_columns_stats(
			&state.columns,
			&state.column_data,
			None,
		));
	}
	if dirty.data || filtered_changed {
		log::debug!("recomputing filtered stats");
		*filtered = Arc::new(compute_columns_stats(
			&state.columns,
			&state.column_data,
			Some(state.filtered.mask()),
		));
	}
	if dirty.data || dirty.selection {
		log::debug!("recomputing selected stats");
		*selected = Arc::new(compute_columns_stats(
			&state.columns,
			&state.column_data,
			Some(state.selected.mask()),
		));
	}
	if dirty.data || filtered_changed || dirty.colors {
		log::debug!("recomputing color transfer functions");
		state.color_transfer_functions =
			Arc::new(color_transfer_functions(state, preferences));
	}
	settled.relevance_stale = dirty.data || filtered_changed || dirty.selection;
	settled
}

fn color_transfer_functions(
	state: &DatasetState,
	preferences: &ColorPreferences,
) -> BTreeMap<String, ColumnTransferFunctions> {
	state
		.columns
		.iter()
		.filter(|column| !column.is_internal() && column.data_type.is_scalar_or_categorical())
		.map(|column| {
			let data = state.column_data.get(&column.key);
			let full =
				create_color_transfer_function(data, Some(&column.data_type), preferences, None);
			let filtered_data = data.map(|data| data.take(state.filtered.indices()));
			let filtered = create_color_transfer_function(
				filtered_data.as_ref(),
				Some(&column.data_type),
				preferences,
				None,
			);
			(column.key.clone(), ColumnTransferFunctions { full, filtered })
		})
		.collect()
}

#[cfg(test)]
fn test_state() -> DatasetState {
	use spotlight_dataframe::WireTable;
	let table: WireTable = serde_json::from_str(
		r#"{
			"uid": "t",
			"generationId": 1,
			"columns": [
				{ "name": "x", "role": "float", "values": [1.0, 2.0, 3.0, 4.0] },
				{ "name": "label", "role": "str", "values": ["a", "b", "a", "b"] },
				{ "name": "__idx__", "role": "int", "values": [0, 1, 2, 3] },
				{ "name": "image", "role": "Image" }
			]
		}"#,
	)
	.unwrap();
	DatasetState::from_table(&table)
}

#[test]
fn test_settle_fills_derived_state() {
	let mut state = test_state();
	let settled = settle(&mut state, Dirty::all(), &ColorPreferences::default());
	assert!(settled.relevance_stale);
	assert!(settled.broken_filters.is_empty());
	assert_eq!(state.filtered.indices(), &[0, 1, 2, 3]);
	assert_eq!(state.column_stats.full["x"].mean, 2.5);
	assert_eq!(state.column_stats.filtered["x"].max, 4.0);
	assert!(!state.column_stats.selected.contains_key("x"));
	let keys: Vec<&String> = state.color_transfer_functions.keys().collect();
	assert_eq!(keys, vec!["label", "x"]);
}

#[test]
fn test_broken_filters_are_removed() {
	use crate::filter::{Filter, FilterOp, PredicateFilter};
	use spotlight_dataframe::ScalarValue;
	let mut state = test_state();
	settle(&mut state, Dirty::all(), &ColorPreferences::default());
	let broken = Filter::new(PredicateFilter::new("x", FilterOp::Contains, ScalarValue::Int(1)));
	let working = Filter::new(PredicateFilter::new(
		"x",
		FilterOp::Gt,
		ScalarValue::float(2.0).unwrap(),
	));
	state.filters = Arc::new(vec![broken.clone(), working.clone()]);
	let settled = settle(&mut state, Dirty::filters(), &ColorPreferences::default());
	assert_eq!(settled.broken_filters.len(), 1);
	assert_eq!(settled.broken_filters[0].id, broken.id());
	assert_eq!(state.filters.len(), 1);
	assert_eq!(state.filters[0].id(), working.id());
	assert_eq!(state.filtered.indices(), &[2, 3]);
	assert_eq!(state.column_stats.filtered["x"].min, 3.0);
	assert!(settled.relevance_stale);
}

#[test]
fn test_highlight_only_changes_nothing_derived() {
	let mut state = test_state();
	settle(&mut state, Dirty::all(), &ColorPreferences::default());
	let before = state.clone();
	let settled = settle(&mut state, Dirty::default(), &ColorPreferences::default());
	assert!(!settled.relevance_stale);
	assert!(Arc::ptr_eq(&before.filtered, &state.filtered));
	assert!(Arc::ptr_eq(
		&before.color_transfer_functions,
		&state.color_transfer_functions
	));
}
