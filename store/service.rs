use spotlight_dataframe::WireTable;
use std::path::Path;

/// The raw content of a single cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
	Value(serde_json::Value),
	Binary(Vec<u8>),
}

/// The backend that serves tables and lazily loaded cells.
pub trait TableService: Send + Sync {
	fn get_table(&self) -> anyhow::Result<WireTable>;

	/// Load the table at `path` on the backend. The next `get_table` returns it.
	fn open_table(&self, path: &Path) -> anyhow::Result<()>;

	/// Fetch one cell of a lazy or binary column. `generation_id` identifies the table the row position refers to.
	fn get_cell_raw(&self, row: usize, column: &str, generation_id: u64)
		-> anyhow::Result<CellValue>;
}

/// Receives user visible error messages.
pub trait Notifier: Send + Sync {
	fn error(&self, title: &str, message: &str);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
	fn error(&self, title: &str, message: &str) {
		log::error!("{}: {}", title, message);
	}
}

#[cfg(test)]
pub mod test {
	use super::*;
	use std::sync::Mutex;

	/// A table service over a table held in memory. Tests swap the table or make requests fail.
	#[derive(Default)]
	pub struct MemoryTableService {
		pub table: Mutex<Option<WireTable>>,
		pub opened: Mutex<Vec<String>>,
	}

	impl MemoryTableService {
		pub fn new(table: WireTable) -> MemoryTableService {
			MemoryTableService {
				table: Mutex::new(Some(table)),
				opened: Mutex::new(Vec::new()),
			}
		}

		pub fn set_table(&self, table: Option<WireTable>) {
			*self.table.lock().unwrap() = table;
		}
	}

	impl TableService for MemoryTableService {
		fn get_table(&self) -> anyhow::Result<WireTable> {
			self.table
				.lock()
				.unwrap()
				.clone()
				.ok_or_else(|| anyhow::format_err!("the table service is unavailable"))
		}

		fn open_table(&self, path: &Path) -> anyhow::Result<()> {
			self.opened.lock().unwrap().push(path.display().to_string());
			Ok(())
		}

		fn get_cell_raw(
			&self,
			row: usize,
			column: &str,
			generation_id: u64,
		) -> anyhow::Result<CellValue> {
			Ok(CellValue::Binary(
				format!("{}:{}:{}", column, row, generation_id).into_bytes(),
			))
		}
	}

	#[derive(Default)]
	pub struct RecordingNotifier {
		pub errors: Mutex<Vec<String>>,
	}

	impl RecordingNotifier {
		pub fn errors(&self) -> Vec<String> {
			self.errors.lock().unwrap().clone()
		}
	}

	impl Notifier for RecordingNotifier {
		fn error(&self, title: &str, _: &str) {
			self.errors.lock().unwrap().push(title.to_owned());
		}
	}
}
