/*!
Selector based subscriptions over immutable state snapshots.

A state container commits a new snapshot, [`enqueue`](Subscriptions::enqueue)s the `(previous, next)` pair while it still holds its own lock, releases the lock and then calls [`dispatch`](Subscriptions::dispatch). Listeners therefore always observe commits in the order they happened, and a listener that mutates the container again only queues another notification instead of recursing.
*/

use std::{
	collections::VecDeque,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc, Mutex,
	},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener<S> = Arc<dyn Fn(&S, &S) + Send + Sync>;

pub struct Subscriptions<S> {
	next_id: AtomicU64,
	listeners: Mutex<Vec<(SubscriptionId, Listener<S>)>>,
	queue: Mutex<Queue<S>>,
}

struct Queue<S> {
	pending: VecDeque<(Arc<S>, Arc<S>)>,
	dispatching: bool,
}

impl<S> Default for Subscriptions<S>
where
	S: Send + Sync + 'static,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<S> Subscriptions<S>
where
	S: Send + Sync + 'static,
{
	pub fn new() -> Self {
		Self {
			next_id: AtomicU64::new(0),
			listeners: Mutex::new(Vec::new()),
			queue: Mutex::new(Queue {
				pending: VecDeque::new(),
				dispatching: false,
			}),
		}
	}

	/// Register `listener` to be called with `(next, previous)` slices whenever the slice picked by `selector` changes according to `equals`.
	pub fn subscribe<T, F, E, L>(&self, selector: F, equals: E, listener: L) -> SubscriptionId
	where
		F: Fn(&S) -> T + Send + Sync + 'static,
		E: Fn(&T, &T) -> bool + Send + Sync + 'static,
		L: Fn(&T, &T) + Send + Sync + 'static,
	{
		let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
		let listener: Listener<S> = Arc::new(move |previous: &S, next: &S| {
			let previous = selector(previous);
			let next = selector(next);
			if !equals(&previous, &next) {
				listener(&next, &previous);
			}
		});
		self.listeners.lock().unwrap().push((id, listener));
		id
	}

	/// Returns `false` if no listener was registered under `id`.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		let mut listeners = self.listeners.lock().unwrap();
		let len = listeners.len();
		listeners.retain(|(listener_id, _)| *listener_id != id);
		listeners.len() != len
	}

	pub fn len(&self) -> usize {
		self.listeners.lock().unwrap().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn enqueue(&self, previous: Arc<S>, next: Arc<S>) {
		if Arc::ptr_eq(&previous, &next) {
			return;
		}
		self.queue.lock().unwrap().pending.push_back((previous, next));
	}

	/// Deliver queued notifications unless another call is already delivering them.
	pub fn dispatch(&self) {
		{
			let mut queue = self.queue.lock().unwrap();
			if queue.dispatching {
				return;
			}
			queue.dispatching = true;
		}
		let _guard = DispatchGuard(&self.queue);
		loop {
			let (previous, next) = {
				let mut queue = self.queue.lock().unwrap();
				match queue.pending.pop_front() {
					Some(item) => item,
					None => {
						// Cleared under the lock that saw the queue empty.
						queue.dispatching = false;
						return;
					}
				}
			};
			let listeners: Vec<Listener<S>> = self
				.listeners
				.lock()
				.unwrap()
				.iter()
				.map(|(_, listener)| listener.clone())
				.collect();
			for listener in listeners {
				listener(&previous, &next);
			}
		}
	}
}

/// Releases the dispatcher role if a listener panics.
struct DispatchGuard<'a, S>(&'a Mutex<Queue<S>>);

impl<'a, S> Drop for DispatchGuard<'a, S> {
	fn drop(&mut self) {
		if !std::thread::panicking() {
			return;
		}
		if let Ok(mut queue) = self.0.lock() {
			queue.dispatching = false;
		}
	}
}

#[test]
fn test_listener_fires_only_when_slice_changes() {
	#[derive(Debug)]
	struct State {
		a: u32,
		b: u32,
	}
	let subscriptions = Subscriptions::<State>::new();
	let seen = Arc::new(Mutex::new(Vec::new()));
	let seen_clone = seen.clone();
	subscriptions.subscribe(
		|state: &State| state.a,
		|a, b| a == b,
		move |next, previous| seen_clone.lock().unwrap().push((*previous, *next)),
	);
	let s0 = Arc::new(State { a: 0, b: 0 });
	let s1 = Arc::new(State { a: 0, b: 1 });
	let s2 = Arc::new(State { a: 2, b: 1 });
	subscriptions.enqueue(s0, s1.clone());
	subscriptions.enqueue(s1, s2.clone());
	subscriptions.dispatch();
	assert_eq!(*seen.lock().unwrap(), vec![(0, 2)]);
	assert_eq!(s2.b, 1);
}

#[test]
fn test_unsubscribe() {
	let subscriptions = Subscriptions::<u32>::new();
	let id = subscriptions.subscribe(|s: &u32| *s, |a, b| a == b, |_, _| {});
	assert_eq!(subscriptions.len(), 1);
	assert!(subscriptions.unsubscribe(id));
	assert!(!subscriptions.unsubscribe(id));
	assert!(subscriptions.is_empty());
}

#[test]
fn test_concurrent_dispatch_delivers_everything() {
	use std::sync::atomic::AtomicUsize;
	let subscriptions = Arc::new(Subscriptions::<usize>::new());
	let delivered = Arc::new(AtomicUsize::new(0));
	let delivered_clone = delivered.clone();
	subscriptions.subscribe(
		|state: &usize| *state,
		|a, b| a == b,
		move |_, _| {
			delivered_clone.fetch_add(1, Ordering::SeqCst);
		},
	);
	let threads: Vec<_> = (0..4)
		.map(|thread| {
			let subscriptions = subscriptions.clone();
			std::thread::spawn(move || {
				for i in 0..1000 {
					let value = thread * 1000 + i;
					subscriptions.enqueue(Arc::new(usize::MAX), Arc::new(value));
					subscriptions.dispatch();
				}
			})
		})
		.collect();
	for thread in threads {
		thread.join().unwrap();
	}
	assert_eq!(delivered.load(Ordering::SeqCst), 4000);
	let queue = subscriptions.queue.lock().unwrap();
	assert!(queue.pending.is_empty());
	assert!(!queue.dispatching);
}

#[test]
fn test_panicking_listener_releases_dispatch() {
	let subscriptions = Arc::new(Subscriptions::<u32>::new());
	let id = subscriptions.subscribe(|s: &u32| *s, |a, b| a == b, |_, _| panic!("listener"));
	subscriptions.enqueue(Arc::new(0), Arc::new(1));
	let subscriptions_clone = subscriptions.clone();
	assert!(std::thread::spawn(move || subscriptions_clone.dispatch())
		.join()
		.is_err());
	subscriptions.unsubscribe(id);
	let seen = Arc::new(Mutex::new(Vec::new()));
	let seen_clone = seen.clone();
	subscriptions.subscribe(
		|s: &u32| *s,
		|a, b| a == b,
		move |next, _| seen_clone.lock().unwrap().push(*next),
	);
	subscriptions.enqueue(Arc::new(1), Arc::new(2));
	subscriptions.dispatch();
	assert_eq!(*seen.lock().unwrap(), vec![2]);
}
