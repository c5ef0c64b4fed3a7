use spotlight_util::subscription::{SubscriptionId, Subscriptions};
use std::sync::{Arc, Mutex};

/// The user's color settings. Every transfer function is derived from a snapshot of these.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ColorPreferences {
	/// Scale continuous colors over `[p5, p95]` instead of `[min, max]`.
	pub robust: bool,
	/// Color int columns with a continuous scale instead of one class per value.
	pub continuous_ints: bool,
	/// Color category columns with a continuous scale over their codes.
	pub continuous_categories: bool,
	/// Int columns with more unique values than this are colored continuously even if `continuous_ints` is off. `None` disables the cap.
	pub max_categorical_ints: Option<usize>,
	pub categorical_palette: String,
	pub continuous_palette: String,
	pub constant_palette: String,
}

impl Default for ColorPreferences {
	fn default() -> Self {
		Self {
			robust: false,
			continuous_ints: false,
			continuous_categories: false,
			max_categorical_ints: None,
			categorical_palette: "Tableau10".to_owned(),
			continuous_palette: "Viridis".to_owned(),
			constant_palette: "Blue".to_owned(),
		}
	}
}

/// A process-wide holder of [`ColorPreferences`]. Clones share the same state.
#[derive(Clone)]
pub struct ColorPreferencesStore {
	inner: Arc<Inner>,
}

struct Inner {
	state: Mutex<Arc<ColorPreferences>>,
	subscriptions: Subscriptions<ColorPreferences>,
}

impl Default for ColorPreferencesStore {
	fn default() -> Self {
		Self::new(ColorPreferences::default())
	}
}

impl ColorPreferencesStore {
	pub fn new(preferences: ColorPreferences) -> Self {
		Self {
			inner: Arc::new(Inner {
				state: Mutex::new(Arc::new(preferences)),
				subscriptions: Subscriptions::new(),
			}),
		}
	}

	pub fn snapshot(&self) -> Arc<ColorPreferences> {
		self.inner.state.lock().unwrap().clone()
	}

	/// Apply `f` to a copy of the preferences and commit the result. Listeners are only notified if something changed.
	pub fn update(&self, f: impl FnOnce(&mut ColorPreferences)) -> Arc<ColorPreferences> {
		let next = {
			let mut state = self.inner.state.lock().unwrap();
			let mut next = ColorPreferences::clone(&state);
			f(&mut next);
			if next == **state {
				return state.clone();
			}
			let next = Arc::new(next);
			let previous = std::mem::replace(&mut *state, next.clone());
			self.inner.subscriptions.enqueue(previous, next.clone());
			next
		};
		self.inner.subscriptions.dispatch();
		next
	}

	pub fn set_robust(&self, robust: bool) -> Arc<ColorPreferences> {
		self.update(|preferences| preferences.robust = robust)
	}

	pub fn set_continuous_ints(&self, continuous_ints: bool) -> Arc<ColorPreferences> {
		self.update(|preferences| preferences.continuous_ints = continuous_ints)
	}

	pub fn set_continuous_categories(&self, continuous_categories: bool) -> Arc<ColorPreferences> {
		self.update(|preferences| preferences.continuous_categories = continuous_categories)
	}

	pub fn set_categorical_palette(&self, name: impl Into<String>) -> Arc<ColorPreferences> {
		let name = name.into();
		self.update(|preferences| preferences.categorical_palette = name)
	}

	pub fn set_continuous_palette(&self, name: impl Into<String>) -> Arc<ColorPreferences> {
		let name = name.into();
		self.update(|preferences| preferences.continuous_palette = name)
	}

	pub fn set_constant_palette(&self, name: impl Into<String>) -> Arc<ColorPreferences> {
		let name = name.into();
		self.update(|preferences| preferences.constant_palette = name)
	}

	/// Call `listener` with `(next, previous)` whenever any preference changes.
	pub fn subscribe<L>(&self, listener: L) -> SubscriptionId
	where
		L: Fn(&ColorPreferences, &ColorPreferences) + Send + Sync + 'static,
	{
		self.inner.subscriptions.subscribe(
			|preferences: &ColorPreferences| preferences.clone(),
			|a, b| a == b,
			move |next, previous| listener(next, previous),
		)
	}

	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		self.inner.subscriptions.unsubscribe(id)
	}
}

#[test]
fn test_update_notifies_only_on_change() {
	use std::sync::atomic::{AtomicUsize, Ordering};
	let store = ColorPreferencesStore::default();
	let calls = Arc::new(AtomicUsize::new(0));
	let calls_clone = calls.clone();
	store.subscribe(move |next, previous| {
		assert!(next.robust);
		assert!(!previous.robust);
		calls_clone.fetch_add(1, Ordering::SeqCst);
	});
	store.set_robust(true);
	store.set_robust(true);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert!(store.snapshot().robust);
}

#[test]
fn test_deserialize_partial_preferences() {
	let preferences: ColorPreferences =
		serde_json::from_str(r#"{ "robust": true, "continuous_palette": "Grays" }"#).unwrap();
	assert!(preferences.robust);
	assert_eq!(preferences.continuous_palette, "Grays");
	assert_eq!(preferences.categorical_palette, "Tableau10");
}
