use crate::{
	filter::PanicsOnRow,
	service::test::{MemoryTableService, RecordingNotifier},
	CellValue, DatasetState, DatasetStore, Filter, FilterOp, PredicateFilter, RowSet,
	SortDirection, StatsKind, StoreConfig, StoreError,
};
use spotlight_colors::{ColorPreferencesStore, TransferFunctionKind};
use spotlight_dataframe::{ScalarValue, WireTable};
use spotlight_relevance::{compute_relevance, RelevanceInput};
use std::{
	path::Path,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
};

pub fn test_table() -> WireTable {
	serde_json::from_value(serde_json::json!({
		"uid": "test",
		"generationId": 7,
		"filename": "test.h5",
		"columns": [
			{ "name": "x", "role": "float", "values": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] },
			{ "name": "group", "role": "int", "values": [0, 0, 1, 1, 2, 2] },
			{ "name": "label", "role": "str", "values": ["a", "b", "a", "b", "c", "c"] },
			{ "name": "image", "role": "Image" }
		]
	}))
	.unwrap()
}

fn short_table() -> WireTable {
	serde_json::from_value(serde_json::json!({
		"uid": "test",
		"generationId": 8,
		"columns": [
			{ "name": "x", "role": "float", "values": [1.0, 2.0, 3.0] }
		]
	}))
	.unwrap()
}

struct Fixture {
	store: DatasetStore,
	service: Arc<MemoryTableService>,
	notifier: Arc<RecordingNotifier>,
}

fn fixture() -> Fixture {
	fixture_with_config(StoreConfig::default())
}

fn fixture_with_config(config: StoreConfig) -> Fixture {
	let _ = env_logger::builder().is_test(true).try_init();
	let service = Arc::new(MemoryTableService::new(test_table()));
	let notifier = Arc::new(RecordingNotifier::default());
	let store = DatasetStore::with_collaborators(
		service.clone(),
		notifier.clone(),
		ColorPreferencesStore::default(),
		config,
	)
	.unwrap();
	store.fetch();
	store.wait_for_relevance();
	Fixture {
		store,
		service,
		notifier,
	}
}

fn assert_row_set(set: &RowSet, length: usize) {
	assert_eq!(set.mask().len(), length);
	for (index, included) in set.mask().iter().enumerate() {
		assert_eq!(*included, set.indices().contains(&index));
	}
	let mut unique = set.indices().to_vec();
	unique.sort_unstable();
	unique.dedup();
	assert_eq!(unique.len(), set.len());
}

fn assert_consistent(state: &DatasetState) {
	assert_row_set(&state.selected, state.length);
	assert_row_set(&state.highlighted, state.length);
	assert_row_set(&state.filtered, state.length);
	assert!(state.filtered.indices().windows(2).all(|pair| pair[0] < pair[1]));
}

fn equals_five() -> Filter {
	Filter::new(PredicateFilter::new("x", FilterOp::Eq, ScalarValue::Int(5)))
}

#[test]
fn test_masks_stay_consistent() {
	let Fixture { store, .. } = fixture();
	let filter = equals_five().inverted(true);
	let filter_id = filter.id();
	let states = vec![
		store.snapshot(),
		store.add_filter(filter),
		store.toggle_filter_enabled(filter_id),
		store.toggle_filter_enabled(filter_id),
		store.select_rows(vec![4, 1, 4, 2]),
		store.select_rows_with(|rows| rows.iter().map(|row| row + 1).collect()),
		store.set_highlighted_rows(vec![true, false, true]),
		store.highlight_row_at(5, false),
		store.highlight_row_at(3, true),
		store.dehighlight_row_at(3),
		store.dehighlight_all(),
		store.sort_by(Some("x"), Some(SortDirection::Desc)),
		store.remove_filter(filter_id),
		store.refresh(),
	];
	for state in states.iter() {
		assert_consistent(state);
	}
	let state = store.snapshot();
	assert_eq!(state.selected.indices(), &[5, 2, 3]);
	assert_eq!(state.filtered.indices(), &[0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_contradictory_filters_filter_everything() {
	let Fixture { store, .. } = fixture();
	let state = store.add_filter(equals_five());
	assert_eq!(state.filtered.indices(), &[4]);
	assert_eq!(state.column_stats(StatsKind::Filtered, "x").unwrap().mean, 5.0);
	let state = store.add_filter(equals_five().inverted(true));
	assert!(state.filtered.is_empty());
	assert!(state.column_stats(StatsKind::Filtered, "x").is_none());
	assert_eq!(state.column_stats(StatsKind::Full, "x").unwrap().mean, 3.5);
}

#[test]
fn test_replace_filter_keeps_position() {
	let Fixture { store, .. } = fixture();
	let first = equals_five();
	let second = Filter::new(PredicateFilter::new("group", FilterOp::Ge, ScalarValue::Int(1)));
	store.add_filter(first.clone());
	store.add_filter(second.clone());
	let replacement = Filter::new(PredicateFilter::new("x", FilterOp::Lt, ScalarValue::Int(6)));
	let state = store.replace_filter(first.id(), replacement.clone());
	let ids: Vec<_> = state.filters.iter().map(|filter| filter.id()).collect();
	assert_eq!(ids, vec![replacement.id(), second.id()]);
	assert_eq!(state.filtered.indices(), &[2, 3, 4]);
	store.wait_for_relevance();
	let before = store.snapshot();
	let unchanged = store.replace_filter(first.id(), equals_five());
	assert!(Arc::ptr_eq(&unchanged, &before));
}

#[test]
fn test_broken_filter_is_removed_and_reported() {
	let Fixture {
		store, notifier, ..
	} = fixture();
	let broken = Filter::new(PredicateFilter::new("missing", FilterOp::Eq, ScalarValue::Int(1)));
	let state = store.add_filter(broken);
	assert!(state.filters.is_empty());
	assert_eq!(state.filtered.len(), 6);
	assert_eq!(notifier.errors(), vec!["Filter removed".to_owned()]);
}

#[test]
fn test_fetch_resets_and_refresh_preserves() {
	let Fixture {
		store, service, ..
	} = fixture();
	let filter = Filter::new(PredicateFilter::new("x", FilterOp::Gt, ScalarValue::Int(1)));
	store.add_filter(filter);
	store.select_rows(vec![1, 2]);
	store.highlight_row_at(5, false);
	store.sort_by(Some("x"), Some(SortDirection::Asc));
	store.sort_by(Some("label"), Some(SortDirection::Desc));

	let state = store.refresh();
	assert_eq!(state.selected.indices(), &[1, 2]);
	assert_eq!(state.highlighted.indices(), &[5]);
	assert_eq!(state.filters.len(), 1);
	assert_eq!(state.filtered.indices(), &[1, 2, 3, 4, 5]);
	assert_eq!(state.sort.len(), 2);

	service.set_table(Some(short_table()));
	let state = store.refresh();
	assert_eq!(state.length, 3);
	assert_eq!(state.generation_id, 8);
	assert_eq!(state.selected.indices(), &[1, 2]);
	assert!(state.highlighted.is_empty());
	assert_eq!(
		state.sort.as_slice(),
		&[("x".to_owned(), SortDirection::Asc)]
	);
	assert_consistent(&state);

	let state = store.fetch();
	assert!(state.selected.is_empty());
	assert!(state.filters.is_empty());
	assert!(state.sort.is_empty());
	assert!(state.highlighted.is_empty());
	assert_eq!(state.filtered.len(), 3);
	assert_consistent(&state);
}

#[test]
fn test_fetch_failure_leaves_an_empty_store() {
	let Fixture {
		store,
		service,
		notifier,
	} = fixture();
	store.select_rows(vec![1]);
	service.set_table(None);
	let state = store.refresh();
	assert_eq!(state.length, 6);
	assert_eq!(state.selected.indices(), &[1]);
	let state = store.fetch();
	assert_eq!(state.length, 0);
	assert!(state.columns.is_empty());
	assert!(state.column_stats.full.is_empty());
	assert_consistent(&state);
	assert_eq!(
		notifier.errors(),
		vec![
			"Failed to refresh table".to_owned(),
			"Failed to load table".to_owned()
		]
	);
}

#[test]
fn test_highlight_no_ops_do_not_notify() {
	let Fixture { store, .. } = fixture();
	let calls = Arc::new(AtomicUsize::new(0));
	let calls_clone = calls.clone();
	store.subscribe(
		|state| state.highlighted.clone(),
		|a, b| Arc::ptr_eq(a, b),
		move |_, _| {
			calls_clone.fetch_add(1, Ordering::SeqCst);
		},
	);
	store.highlight_row_at(1, false);
	store.highlight_row_at(1, false);
	store.highlight_row_at(1, true);
	store.dehighlight_row_at(4);
	store.highlight_row_at(42, false);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	store.highlight_row_at(2, false);
	store.highlight_row_at(2, true);
	assert_eq!(store.snapshot().highlighted.indices(), &[2]);
	store.set_highlighted_rows(vec![false, false, true]);
	store.dehighlight_all();
	store.dehighlight_all();
	assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_sort_by() {
	let Fixture { store, .. } = fixture();
	let once = store.sort_by(Some("x"), Some(SortDirection::Asc));
	let twice = store.sort_by(Some("x"), Some(SortDirection::Asc));
	assert!(Arc::ptr_eq(&once, &twice));
	assert_eq!(twice.sort.as_slice(), &[("x".to_owned(), SortDirection::Asc)]);
	store.sort_by(Some("group"), Some(SortDirection::Desc));
	let state = store.sort_by(Some("x"), Some(SortDirection::Desc));
	insta::assert_debug_snapshot!(state.sort, @r###"
 [
     (
         "group",
         Desc,
     ),
     (
         "x",
         Desc,
     ),
 ]
 "###);
	assert_eq!(state.sorted_indices(), vec![5, 4, 3, 2, 1, 0]);
	let state = store.sort_by(Some("group"), None);
	assert_eq!(state.sort.len(), 1);
	let state = store.sort_by(None, None);
	assert!(state.sort.is_empty());
	let state = store.sort_by(None, Some(SortDirection::Asc));
	assert!(state.sort.is_empty());
}

fn expected_relevance(state: &DatasetState) -> spotlight_relevance::Relevances {
	compute_relevance(&RelevanceInput {
		columns: state.columns.clone(),
		data: state.column_data.clone(),
		foreground: Arc::new(state.selected.indices().to_vec()),
		background: Arc::new(state.filtered.indices().to_vec()),
		n_bins: spotlight_relevance::DEFAULT_RELEVANCE_BINS,
	})
}

#[test]
fn test_relevance_is_normalized() {
	let Fixture { store, .. } = fixture();
	store.select_rows(vec![0, 1]);
	store.wait_for_relevance();
	let state = store.snapshot();
	let relevance = &state.column_relevance;
	assert!(relevance.contains_key("x"));
	assert!(relevance.contains_key("group"));
	assert!(!relevance.contains_key("label"));
	let max = relevance.values().cloned().fold(0.0, f64::max);
	assert_eq!(max, 1.0);
	assert!(relevance.values().all(|value| *value >= 0.0 && *value <= 1.0));
}

#[test]
fn test_latest_relevance_request_wins() {
	let Fixture { store, .. } = fixture();
	store.select_rows(vec![0, 1]);
	store.recompute_column_relevance();
	store.select_rows(vec![4, 5]);
	store.add_filter(Filter::new(PredicateFilter::new(
		"group",
		FilterOp::Ge,
		ScalarValue::Int(1),
	)));
	store.wait_for_relevance();
	let state = store.snapshot();
	assert_eq!(*state.column_relevance, expected_relevance(&state));
}

#[test]
fn test_color_preferences_recompute_transfer_functions() {
	let Fixture { store, .. } = fixture();
	let state = store.snapshot();
	let functions = &state.color_transfer_functions;
	assert!(functions.contains_key("x"));
	assert!(functions.contains_key("label"));
	assert!(!functions.contains_key("image"));
	assert_eq!(functions["x"].full.palette_name(), "Viridis");
	match &functions["group"].full.kind {
		TransferFunctionKind::Categorical { domain } => assert_eq!(domain.len(), 3),
		kind => panic!("unexpected {:?}", kind),
	}
	store.color_preferences().set_continuous_palette("Grays");
	store.color_preferences().set_continuous_ints(true);
	let state = store.snapshot();
	assert_eq!(state.color_transfer_functions["x"].full.palette_name(), "Grays");
	match &state.color_transfer_functions["group"].full.kind {
		TransferFunctionKind::Continuous { domain, .. } => assert_eq!(*domain, (0.0, 2.0)),
		kind => panic!("unexpected {:?}", kind),
	}
}

#[test]
fn test_filtered_transfer_functions_follow_the_filter() {
	let Fixture { store, .. } = fixture();
	let state = store.add_filter(Filter::new(PredicateFilter::new(
		"x",
		FilterOp::Le,
		ScalarValue::Int(3),
	)));
	let functions = &state.color_transfer_functions["x"];
	assert_eq!(
		functions.full.kind,
		TransferFunctionKind::Continuous {
			domain: (1.0, 6.0),
			class_breaks: None
		}
	);
	assert_eq!(
		functions.filtered.kind,
		TransferFunctionKind::Continuous {
			domain: (1.0, 3.0),
			class_breaks: None
		}
	);
}

#[test]
fn test_categorical_int_cap_from_config() {
	let config = StoreConfig {
		max_categorical_ints: Some(2),
		..Default::default()
	};
	let Fixture { store, .. } = fixture_with_config(config);
	match &store.snapshot().color_transfer_functions["group"].full.kind {
		TransferFunctionKind::Continuous { domain, .. } => assert_eq!(*domain, (0.0, 2.0)),
		kind => panic!("unexpected {:?}", kind),
	}
}

#[test]
fn test_get_cell() {
	let Fixture { store, .. } = fixture();
	assert_eq!(
		store.get_cell(2, "x").unwrap(),
		CellValue::Value(serde_json::json!(3.0))
	);
	assert_eq!(
		store.get_cell(1, "image").unwrap(),
		CellValue::Binary(b"image:1:7".to_vec())
	);
	assert!(matches!(
		store.get_cell(0, "nope"),
		Err(StoreError::UnknownColumn(_))
	));
	assert!(matches!(
		store.get_cell(6, "x"),
		Err(StoreError::RowOutOfRange { row: 6, length: 6 })
	));
}

#[test]
fn test_open_table_fetches() {
	let Fixture {
		store, service, ..
	} = fixture();
	store.select_rows(vec![0]);
	let state = store.open_table(Path::new("other.h5")).unwrap();
	assert_eq!(*service.opened.lock().unwrap(), vec!["other.h5".to_owned()]);
	assert!(state.selected.is_empty());
}

#[test]
fn test_listeners_observe_commits_in_order() {
	let Fixture { store, .. } = fixture();
	let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
	let seen_clone = seen.clone();
	let inner = Arc::downgrade(&store.inner);
	store.subscribe(
		|state| state.filtered.len(),
		|a, b| a == b,
		move |next, _| {
			seen_clone.lock().unwrap().push(*next);
			// Mutating from a listener queues another notification instead of recursing.
			if *next == 1 {
				if let Some(inner) = inner.upgrade() {
					DatasetStore { inner }.add_filter(equals_five().inverted(true));
				}
			}
		},
	);
	store.add_filter(equals_five());
	assert_eq!(*seen.lock().unwrap(), vec![1, 0]);
}

#[test]
fn test_panicking_filter_does_not_break_the_store() {
	let Fixture {
		store, notifier, ..
	} = fixture();
	let state = store.add_filter(Filter::new(PanicsOnRow(3)));
	assert!(state.filters.is_empty());
	assert_eq!(state.filtered.len(), 6);
	assert_eq!(notifier.errors(), vec!["Filter removed".to_owned()]);
	let state = store.select_rows(vec![1, 2]);
	assert_eq!(state.selected.indices(), &[1, 2]);
	assert_eq!(store.snapshot().selected.len(), 2);
	assert_consistent(&store.snapshot());
}
