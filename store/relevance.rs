/*!
Relevance runs on the worker thread and is superseded by generation rather than cancelled.

Every request bumps `generation`. If a computation is already in flight the request returns, otherwise it submits one tagged with the current generation. When a computation completes with an outdated generation its result is dropped and a new one is submitted from a fresh snapshot. Only a computation whose generation is still current commits, so an older result never overwrites a newer one.

Lock order is the control mutex, then the state mutex.
*/

use crate::Inner;
use spotlight_relevance::{RelevanceError, RelevanceInput, Relevances};
use std::sync::{Arc, MutexGuard};

#[derive(Debug, Default)]
pub(crate) struct RelevanceControl {
	pub generation: u64,
	pub in_flight: bool,
}

impl Inner {
	pub(crate) fn recompute_relevance(self: &Arc<Self>) {
		let mut control = self.relevance.lock().unwrap();
		control.generation += 1;
		if control.in_flight {
			return;
		}
		control.in_flight = true;
		let generation = control.generation;
		self.submit_relevance(control, generation);
	}

	/// Block until no relevance computation is in flight.
	pub(crate) fn wait_for_relevance(&self) {
		let mut control = self.relevance.lock().unwrap();
		while control.in_flight {
			control = self.relevance_done.wait(control).unwrap();
		}
	}

	fn relevance_input(&self) -> RelevanceInput {
		let state = self.state.lock().unwrap().clone();
		RelevanceInput {
			columns: state.columns.clone(),
			data: state.column_data.clone(),
			foreground: Arc::new(state.selected.indices().to_vec()),
			background: Arc::new(state.filtered.indices().to_vec()),
			n_bins: self.relevance_bins,
		}
	}

	fn submit_relevance(self: &Arc<Self>, mut control: MutexGuard<RelevanceControl>, generation: u64) {
		let input = self.relevance_input();
		let inner = Arc::downgrade(self);
		let submitted = self.worker.submit(input, move |result| {
			if let Some(inner) = inner.upgrade() {
				inner.complete_relevance(generation, result);
			}
		});
		if let Err(error) = submitted {
			control.in_flight = false;
			drop(control);
			self.relevance_done.notify_all();
			self.relevance_failed(&error);
		}
	}

	pub(crate) fn complete_relevance(
		self: &Arc<Self>,
		generation: u64,
		result: Result<Relevances, RelevanceError>,
	) {
		let control = self.relevance.lock().unwrap();
		if control.generation != generation {
			log::debug!(
				"discarding relevance for generation {}, restarting at {}",
				generation,
				control.generation
			);
			let generation = control.generation;
			self.submit_relevance(control, generation);
			return;
		}
		let mut control = control;
		let result = match result {
			Ok(relevances) => {
				self.commit(|state| {
					state.column_relevance = Arc::new(relevances);
				});
				Ok(())
			}
			Err(error) => Err(error),
		};
		control.in_flight = false;
		drop(control);
		self.relevance_done.notify_all();
		self.subscriptions.dispatch();
		if let Err(error) = result {
			self.relevance_failed(&error);
		}
	}

	fn relevance_failed(&self, error: &RelevanceError) {
		log::error!("failed to compute column relevance: {}", error);
		self.notifier
			.error("Failed to compute column relevance", &error.to_string());
	}
}

#[test]
fn test_outdated_result_is_discarded() {
	use crate::{service::test::MemoryTableService, test::test_table, DatasetStore, StoreConfig};
	use maplit::btreemap;
	let service = Arc::new(MemoryTableService::new(test_table()));
	let store = DatasetStore::new(service, StoreConfig::default()).unwrap();
	store.fetch();
	store.select_rows(vec![0, 1]);
	store.wait_for_relevance();
	let expected = store.snapshot().column_relevance.clone();
	assert!(!expected.is_empty());
	{
		let mut control = store.inner.relevance.lock().unwrap();
		control.generation += 1;
		control.in_flight = true;
	}
	let stale = btreemap! { "x".to_owned() => 0.123 };
	store.inner.complete_relevance(0, Ok(stale));
	store.wait_for_relevance();
	assert_eq!(store.snapshot().column_relevance, expected);
}

#[test]
fn test_failed_relevance_keeps_the_last_result() {
	use crate::{
		service::test::{MemoryTableService, RecordingNotifier},
		test::test_table,
		DatasetStore, StoreConfig,
	};
	use spotlight_colors::ColorPreferencesStore;
	let notifier = Arc::new(RecordingNotifier::default());
	let store = DatasetStore::with_collaborators(
		Arc::new(MemoryTableService::new(test_table())),
		notifier.clone(),
		ColorPreferencesStore::default(),
		StoreConfig::default(),
	)
	.unwrap();
	store.fetch();
	store.select_rows(vec![0, 1]);
	store.wait_for_relevance();
	let expected = store.snapshot().column_relevance.clone();
	assert!(!expected.is_empty());
	let generation = {
		let mut control = store.inner.relevance.lock().unwrap();
		control.generation += 1;
		control.in_flight = true;
		control.generation
	};
	store.inner.complete_relevance(
		generation,
		Err(RelevanceError::Panicked("histogram".to_owned())),
	);
	store.wait_for_relevance();
	assert_eq!(store.snapshot().column_relevance, expected);
	assert_eq!(
		notifier.errors(),
		vec!["Failed to compute column relevance".to_owned()]
	);
}
