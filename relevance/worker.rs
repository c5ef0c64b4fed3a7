use crate::compute::{compute_relevance, RelevanceInput, Relevances};
use crossbeam::channel::{unbounded, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};

#[derive(Debug, thiserror::Error)]
pub enum RelevanceError {
	#[error("failed to spawn the relevance worker")]
	Spawn(#[from] std::io::Error),
	#[error("the relevance worker has shut down")]
	Disconnected,
	#[error("relevance computation panicked: {0}")]
	Panicked(String),
}

type Done = Box<dyn FnOnce(Result<Relevances, RelevanceError>) + Send + 'static>;

struct Task {
	input: RelevanceInput,
	done: Done,
}

/// A background thread that runs relevance computations one at a time, in submission order.
///
/// Dropping the worker closes its queue and waits for the running task to finish. If the last handle is dropped on the worker thread itself, for example from a completion callback, the thread is detached instead.
#[derive(Debug)]
pub struct RelevanceWorker {
	task_sender: Option<Sender<Task>>,
	join_handle: Option<std::thread::JoinHandle<()>>,
}

impl RelevanceWorker {
	pub fn new() -> Result<RelevanceWorker, RelevanceError> {
		let (task_sender, task_receiver) = unbounded::<Task>();
		let join_handle = std::thread::Builder::new()
			.name("spotlight-relevance".to_owned())
			.spawn(move || loop {
				match task_receiver.recv() {
					Err(_) => break,
					Ok(task) => run(task),
				};
			})?;
		Ok(RelevanceWorker {
			task_sender: Some(task_sender),
			join_handle: Some(join_handle),
		})
	}

	/// Queue a computation. `done` is called on the worker thread with the result.
	pub fn submit<F>(&self, input: RelevanceInput, done: F) -> Result<(), RelevanceError>
	where
		F: FnOnce(Result<Relevances, RelevanceError>) + Send + 'static,
	{
		let task = Task {
			input,
			done: Box::new(done),
		};
		self.task_sender
			.as_ref()
			.ok_or(RelevanceError::Disconnected)?
			.send(task)
			.map_err(|_| RelevanceError::Disconnected)
	}
}

fn run(task: Task) {
	let Task { input, done } = task;
	let result = catch_unwind(AssertUnwindSafe(|| compute_relevance(&input)))
		.map_err(|payload| RelevanceError::Panicked(panic_message(payload.as_ref())));
	if catch_unwind(AssertUnwindSafe(move || done(result))).is_err() {
		log::error!("relevance completion callback panicked");
	}
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_owned()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_owned()
	}
}

impl Drop for RelevanceWorker {
	fn drop(&mut self) {
		self.task_sender.take();
		if let Some(join_handle) = self.join_handle.take() {
			if join_handle.thread().id() == std::thread::current().id() {
				return;
			}
			if join_handle.join().is_err() {
				log::error!("relevance worker thread panicked");
			}
		}
	}
}

#[test]
fn test_worker_runs_tasks_in_order() {
	use crossbeam::channel::bounded;
	use spotlight_dataframe::{Column, ColumnData, DataFrame, DataType};
	use std::sync::Arc;
	let data = DataFrame::from_columns(vec![(
		"value".to_owned(),
		ColumnData::Float(vec![0.0, 0.0, 10.0, 10.0]),
	)]);
	let input = RelevanceInput {
		columns: Arc::new(vec![Column::new("value", DataType::Float)]),
		data: Arc::new(data),
		foreground: Arc::new(vec![0, 1]),
		background: Arc::new(vec![0, 1, 2, 3]),
		n_bins: crate::DEFAULT_RELEVANCE_BINS,
	};
	let worker = RelevanceWorker::new().unwrap();
	let (sender, receiver) = bounded(2);
	for i in 0..2 {
		let sender = sender.clone();
		worker
			.submit(input.clone(), move |result| {
				sender.send((i, result.unwrap())).unwrap();
			})
			.unwrap();
	}
	let (first, relevances) = receiver.recv().unwrap();
	assert_eq!(first, 0);
	assert_eq!(relevances.get("value"), Some(&1.0));
	assert_eq!(receiver.recv().unwrap().0, 1);
}

#[test]
fn test_panicking_callback_keeps_worker_alive() {
	use crossbeam::channel::bounded;
	use spotlight_dataframe::DataFrame;
	use std::sync::Arc;
	let input = RelevanceInput {
		columns: Arc::new(Vec::new()),
		data: Arc::new(DataFrame::new(0)),
		foreground: Arc::new(Vec::new()),
		background: Arc::new(Vec::new()),
		n_bins: crate::DEFAULT_RELEVANCE_BINS,
	};
	let worker = RelevanceWorker::new().unwrap();
	worker.submit(input.clone(), |_| panic!("boom")).unwrap();
	let (sender, receiver) = bounded(1);
	worker
		.submit(input, move |result| {
			sender.send(result.is_ok()).unwrap();
		})
		.unwrap();
	assert!(receiver.recv().unwrap());
}
