/*!
This crate implements the dataset store: a table fetched from a [`TableService`](trait.TableService.html), the filtered, selected and highlighted rows, a sort spec and everything derived from them, namely per column stats, color transfer functions and relevance scores.

Every mutation produces a new immutable [`DatasetState`](struct.DatasetState.html) snapshot. Derived state is brought up to date before the snapshot is committed, except for relevance which is computed on a worker thread and committed later. Subscribers pick a slice of the state with a selector and are called after the state lock is released, in commit order.

```no_run
use spotlight_store::{DatasetStore, StoreConfig, TableService};
use std::sync::Arc;

fn run(service: Arc<dyn TableService>) -> Result<(), spotlight_store::StoreError> {
	let store = DatasetStore::new(service, StoreConfig::default())?;
	store.subscribe(
		|state| state.filtered.clone(),
		|a, b| a == b,
		|next, _| println!("{} rows filtered in", next.len()),
	);
	store.fetch();
	store.select_rows(vec![0, 1, 2]);
	store.wait_for_relevance();
	println!("{:?}", store.snapshot().column_relevance);
	Ok(())
}
```
*/

#![allow(clippy::tabs_in_doc_comments)]

use self::{cascade::Dirty, relevance::RelevanceControl};
use spotlight_colors::{ColorPreferences, ColorPreferencesStore};
use spotlight_relevance::{RelevanceError, RelevanceWorker};
use spotlight_util::subscription::{SubscriptionId, Subscriptions};
use std::{
	path::Path,
	sync::{Arc, Condvar, Mutex},
};

mod cascade;
mod config;
mod filter;
mod relevance;
mod service;
mod state;

pub use self::config::{ConfigError, StoreConfig};
pub use self::filter::{
	compute_filtered, BrokenFilter, Filter, FilterError, FilterId, FilterOp, Predicate,
	PredicateFilter, SetFilter,
};
pub use self::service::{CellValue, LogNotifier, Notifier, TableService};
pub use self::state::{
	ColumnStatsTables, ColumnTransferFunctions, DatasetState, RowSet, SortDirection, SortSpec,
	StatsKind,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("unknown column {0:?}")]
	UnknownColumn(String),
	#[error("row {row} is out of range for a table with {length} rows")]
	RowOutOfRange { row: usize, length: usize },
	#[error("table service request failed")]
	Service(#[source] anyhow::Error),
	#[error(transparent)]
	Relevance(#[from] RelevanceError),
}

/// A handle to a dataset store. Clones share the same store.
#[derive(Clone)]
pub struct DatasetStore {
	inner: Arc<Inner>,
}

pub(crate) struct Inner {
	state: Mutex<Arc<DatasetState>>,
	subscriptions: Subscriptions<DatasetState>,
	service: Arc<dyn TableService>,
	notifier: Arc<dyn Notifier>,
	preferences: ColorPreferencesStore,
	preferences_subscription: Mutex<Option<SubscriptionId>>,
	max_categorical_ints: Option<usize>,
	relevance_bins: usize,
	relevance: Mutex<RelevanceControl>,
	relevance_done: Condvar,
	worker: RelevanceWorker,
}

impl DatasetStore {
	/// Create a store that reports errors to the log and owns its color preferences.
	pub fn new(service: Arc<dyn TableService>, config: StoreConfig) -> Result<DatasetStore, StoreError> {
		let preferences = ColorPreferencesStore::new(
			config.color_preferences.clone().unwrap_or_default(),
		);
		DatasetStore::with_collaborators(service, Arc::new(LogNotifier), preferences, config)
	}

	pub fn with_collaborators(
		service: Arc<dyn TableService>,
		notifier: Arc<dyn Notifier>,
		preferences: ColorPreferencesStore,
		config: StoreConfig,
	) -> Result<DatasetStore, StoreError> {
		let inner = Arc::new(Inner {
			state: Mutex::new(Arc::new(DatasetState::default())),
			subscriptions: Subscriptions::new(),
			service,
			notifier,
			preferences: preferences.clone(),
			preferences_subscription: Mutex::new(None),
			max_categorical_ints: config.max_categorical_ints,
			relevance_bins: config.relevance_bins(),
			relevance: Mutex::new(RelevanceControl::default()),
			relevance_done: Condvar::new(),
			worker: RelevanceWorker::new()?,
		});
		let weak = Arc::downgrade(&inner);
		let id = preferences.subscribe(move |_, _| {
			if let Some(inner) = weak.upgrade() {
				inner.mutate(|_| Some(Dirty::colors()));
			}
		});
		*inner.preferences_subscription.lock().unwrap() = Some(id);
		Ok(DatasetStore { inner })
	}

	pub fn snapshot(&self) -> Arc<DatasetState> {
		self.inner.state.lock().unwrap().clone()
	}

	pub fn color_preferences(&self) -> &ColorPreferencesStore {
		&self.inner.preferences
	}

	/// Call `listener` with `(next, previous)` whenever the slice of the state picked by `selector` changes according to `equals`.
	pub fn subscribe<T, F, E, L>(&self, selector: F, equals: E, listener: L) -> SubscriptionId
	where
		F: Fn(&DatasetState) -> T + Send + Sync + 'static,
		E: Fn(&T, &T) -> bool + Send + Sync + 'static,
		L: Fn(&T, &T) + Send + Sync + 'static,
	{
		self.inner.subscriptions.subscribe(selector, equals, listener)
	}

	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		self.inner.subscriptions.unsubscribe(id)
	}

	/// Load the table and reset filters, selection, highlight, sort and relevance. If the table cannot be loaded the store is left empty.
	pub fn fetch(&self) -> Arc<DatasetState> {
		match self.inner.service.get_table() {
			Ok(table) => {
				log::info!(
					"fetched table {} with {} columns",
					table.uid,
					table.columns.len()
				);
				self.inner.mutate(|state| {
					*state = DatasetState::from_table(&table);
					Some(Dirty::all())
				})
			}
			Err(error) => {
				log::error!("failed to fetch table: {:#}", error);
				self.inner
					.notifier
					.error("Failed to load table", &format!("{:#}", error));
				self.inner.mutate(|state| {
					*state = DatasetState::default();
					Some(Dirty::all())
				})
			}
		}
	}

	/// Reload the table, keeping filters, selection, highlight and the sort keys whose columns still exist. If the table cannot be loaded the store is left as it was.
	pub fn refresh(&self) -> Arc<DatasetState> {
		let table = match self.inner.service.get_table() {
			Ok(table) => table,
			Err(error) => {
				log::error!("failed to refresh table: {:#}", error);
				self.inner
					.notifier
					.error("Failed to refresh table", &format!("{:#}", error));
				return self.snapshot();
			}
		};
		log::info!(
			"refreshed table {} with {} columns",
			table.uid,
			table.columns.len()
		);
		self.inner.mutate(|state| {
			let mut next = DatasetState::from_table(&table);
			let length = next.length;
			next.filters = state.filters.clone();
			next.selected = Arc::new(RowSet::from_indices(
				state.selected.indices().iter().copied(),
				length,
			));
			next.highlighted = Arc::new(RowSet::from_indices(
				state.highlighted.indices().iter().copied(),
				length,
			));
			let sort: SortSpec = state
				.sort
				.iter()
				.filter(|(key, _)| next.column(key).is_some())
				.cloned()
				.collect();
			next.sort = Arc::new(sort);
			next.column_relevance = state.column_relevance.clone();
			*state = next;
			Some(Dirty::all())
		})
	}

	/// Ask the backend to load the table at `path`, then fetch it.
	pub fn open_table(&self, path: &Path) -> Result<Arc<DatasetState>, StoreError> {
		if let Err(error) = self.inner.service.open_table(path) {
			log::error!("failed to open table {}: {:#}", path.display(), error);
			self.inner
				.notifier
				.error("Failed to open table", &format!("{:#}", error));
			return Err(StoreError::Service(error));
		}
		Ok(self.fetch())
	}

	pub fn add_filter(&self, filter: Filter) -> Arc<DatasetState> {
		self.inner.mutate(|state| {
			Arc::make_mut(&mut state.filters).push(filter);
			Some(Dirty::filters())
		})
	}

	pub fn remove_filter(&self, id: FilterId) -> Arc<DatasetState> {
		self.inner.mutate(|state| {
			if !state.filters.iter().any(|filter| filter.id() == id) {
				return None;
			}
			Arc::make_mut(&mut state.filters).retain(|filter| filter.id() != id);
			Some(Dirty::filters())
		})
	}

	pub fn toggle_filter_enabled(&self, id: FilterId) -> Arc<DatasetState> {
		self.inner.mutate(|state| {
			let filters = Arc::make_mut(&mut state.filters);
			let filter = filters.iter_mut().find(|filter| filter.id() == id)?;
			filter.enabled = !filter.enabled;
			Some(Dirty::filters())
		})
	}

	/// Replace the filter `id` with `filter` at the same position.
	pub fn replace_filter(&self, id: FilterId, filter: Filter) -> Arc<DatasetState> {
		self.inner.mutate(|state| {
			let filters = Arc::make_mut(&mut state.filters);
			let slot = filters.iter_mut().find(|filter| filter.id() == id)?;
			*slot = filter;
			Some(Dirty::filters())
		})
	}

	/// Select exactly `rows`. Duplicates are removed and the order of first occurrence is kept.
	pub fn select_rows(&self, rows: impl IntoIterator<Item = usize>) -> Arc<DatasetState> {
		let rows: Vec<usize> = rows.into_iter().collect();
		self.select_rows_with(move |_| rows)
	}

	/// Select the rows `updater` returns for the current selection.
	pub fn select_rows_with<F>(&self, updater: F) -> Arc<DatasetState>
	where
		F: FnOnce(&[usize]) -> Vec<usize>,
	{
		self.inner.mutate(|state| {
			let rows = updater(state.selected.indices());
			let selected = RowSet::from_indices(rows, state.length);
			if selected == *state.selected {
				return None;
			}
			state.selected = Arc::new(selected);
			Some(Dirty::selection())
		})
	}

	/// Highlight the rows where `mask` is true. The mask is padded or truncated to the table length.
	pub fn set_highlighted_rows(&self, mut mask: Vec<bool>) -> Arc<DatasetState> {
		self.inner.mutate(|state| {
			mask.resize(state.length, false);
			if mask.as_slice() == state.highlighted.mask() {
				return None;
			}
			state.highlighted = Arc::new(RowSet::from_mask(mask));
			Some(Dirty::default())
		})
	}

	/// Highlight `row`, and unhighlight every other row if `only` is set.
	pub fn highlight_row_at(&self, row: usize, only: bool) -> Arc<DatasetState> {
		self.inner.mutate(|state| {
			if row >= state.length {
				log::warn!("cannot highlight row {} of {}", row, state.length);
				return None;
			}
			let highlighted = Arc::make_mut(&mut state.highlighted);
			if only {
				if highlighted.indices() == [row] {
					return None;
				}
				highlighted.clear();
			} else if highlighted.contains(row) {
				return None;
			}
			highlighted.insert(row);
			Some(Dirty::default())
		})
	}

	pub fn dehighlight_row_at(&self, row: usize) -> Arc<DatasetState> {
		self.inner.mutate(|state| {
			if !state.highlighted.contains(row) {
				return None;
			}
			Arc::make_mut(&mut state.highlighted).remove(row);
			Some(Dirty::default())
		})
	}

	pub fn dehighlight_all(&self) -> Arc<DatasetState> {
		self.inner.mutate(|state| {
			if state.highlighted.is_empty() {
				return None;
			}
			Arc::make_mut(&mut state.highlighted).clear();
			Some(Dirty::default())
		})
	}

	/// Without a column, clear the sort. Otherwise move `column` to the end of the sort spec with `direction`, or remove it if there is no direction.
	pub fn sort_by(&self, column: Option<&str>, direction: Option<SortDirection>) -> Arc<DatasetState> {
		self.inner.mutate(|state| {
			let mut sort = SortSpec::clone(&state.sort);
			match column {
				None => sort.clear(),
				Some(column) => {
					sort.retain(|(key, _)| key != column);
					if let Some(direction) = direction {
						sort.push((column.to_owned(), direction));
					}
				}
			}
			if sort == *state.sort {
				return None;
			}
			state.sort = Arc::new(sort);
			Some(Dirty::default())
		})
	}

	/// Start recomputing column relevance on the worker thread. The result is committed once it is ready.
	pub fn recompute_column_relevance(&self) {
		self.inner.recompute_relevance();
	}

	/// Block until the last requested relevance computation has been committed or has failed.
	pub fn wait_for_relevance(&self) {
		self.inner.wait_for_relevance();
	}

	pub fn recompute_color_transfer_functions(&self) -> Arc<DatasetState> {
		self.inner.mutate(|_| Some(Dirty::colors()))
	}

	/// Get the value of a cell. Lazy and binary columns are fetched from the table service.
	pub fn get_cell(&self, row: usize, column: &str) -> Result<CellValue, StoreError> {
		let state = self.snapshot();
		let descriptor = state
			.column(column)
			.ok_or_else(|| StoreError::UnknownColumn(column.to_owned()))?;
		if row >= state.length {
			return Err(StoreError::RowOutOfRange {
				row,
				length: state.length,
			});
		}
		if descriptor.lazy || descriptor.binary {
			return self
				.inner
				.service
				.get_cell_raw(row, column, state.generation_id)
				.map_err(StoreError::Service);
		}
		let value = state
			.column_data
			.get(column)
			.and_then(|data| data.json_at(row))
			.unwrap_or(serde_json::Value::Null);
		Ok(CellValue::Value(value))
	}
}

impl Inner {
	fn color_preferences(&self) -> ColorPreferences {
		let mut preferences = ColorPreferences::clone(&self.preferences.snapshot());
		preferences.max_categorical_ints =
			preferences.max_categorical_ints.or(self.max_categorical_ints);
		preferences
	}

	/// Apply `f` to a copy of the state, settle what it marked dirty, commit and notify. If `f` returns `None` nothing is committed.
	fn mutate<F>(self: &Arc<Self>, f: F) -> Arc<DatasetState>
	where
		F: FnOnce(&mut DatasetState) -> Option<Dirty>,
	{
		let (next, settled) = {
			let mut state = self.state.lock().unwrap();
			let mut next = DatasetState::clone(&state);
			let dirty = match f(&mut next) {
				Some(dirty) => dirty,
				None => return state.clone(),
			};
			let settled = cascade::settle(&mut next, dirty, &self.color_preferences());
			let next = Arc::new(next);
			let previous = std::mem::replace(&mut *state, next.clone());
			self.subscriptions.enqueue(previous, next.clone());
			(next, settled)
		};
		self.subscriptions.dispatch();
		for broken in settled.broken_filters.iter() {
			log::warn!(
				"removed filter {:?} after it failed on row {}: {}",
				broken.id,
				broken.row,
				broken.error
			);
			self.notifier.error(
				"Filter removed",
				&format!("the filter failed on row {}: {}", broken.row, broken.error),
			);
		}
		if settled.relevance_stale {
			self.recompute_relevance();
		}
		next
	}

	/// Commit `f` applied to a copy of the state without settling. The caller dispatches.
	fn commit<F>(&self, f: F) -> Arc<DatasetState>
	where
		F: FnOnce(&mut DatasetState),
	{
		let mut state = self.state.lock().unwrap();
		let mut next = DatasetState::clone(&state);
		f(&mut next);
		let next = Arc::new(next);
		let previous = std::mem::replace(&mut *state, next.clone());
		self.subscriptions.enqueue(previous, next.clone());
		next
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		if let Ok(mut id) = self.preferences_subscription.lock() {
			if let Some(id) = id.take() {
				self.preferences.unsubscribe(id);
			}
		}
	}
}

#[cfg(test)]
mod test;
