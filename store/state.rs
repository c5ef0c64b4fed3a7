use crate::filter::Filter;
use spotlight_colors::TransferFunction;
use spotlight_dataframe::{Column, DataFrame, WireTable};
use spotlight_relevance::Relevances;
use spotlight_stats::{DataStatistics, StatsMap};
use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

/// A set of rows kept both as a mask over all rows and as a list of row positions.
///
/// `mask[i]` is true for exactly the positions in `indices`. Indices are unique.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowSet {
	mask: Vec<bool>,
	indices: Vec<usize>,
}

impl RowSet {
	pub fn empty(length: usize) -> RowSet {
		RowSet {
			mask: vec![false; length],
			indices: Vec::new(),
		}
	}

	pub fn all(length: usize) -> RowSet {
		RowSet {
			mask: vec![true; length],
			indices: (0..length).collect(),
		}
	}

	/// The indices of a set built from a mask are ascending.
	pub fn from_mask(mask: Vec<bool>) -> RowSet {
		let indices = mask
			.iter()
			.enumerate()
			.filter_map(|(index, included)| if *included { Some(index) } else { None })
			.collect();
		RowSet { mask, indices }
	}

	/// Build a set over `length` rows, keeping the first occurrence of each index in order. Indices past `length` are dropped.
	pub fn from_indices(indices: impl IntoIterator<Item = usize>, length: usize) -> RowSet {
		let mut set = RowSet::empty(length);
		let mut n_dropped = 0;
		for index in indices {
			if index >= length {
				n_dropped += 1;
				continue;
			}
			set.insert(index);
		}
		if n_dropped > 0 {
			log::warn!("dropped {} row indices outside of {} rows", n_dropped, length);
		}
		set
	}

	pub fn mask(&self) -> &[bool] {
		&self.mask
	}

	pub fn indices(&self) -> &[usize] {
		&self.indices
	}

	pub fn len(&self) -> usize {
		self.indices.len()
	}

	pub fn is_empty(&self) -> bool {
		self.indices.is_empty()
	}

	pub fn contains(&self, index: usize) -> bool {
		self.mask.get(index).copied().unwrap_or(false)
	}

	/// Returns false if `index` was already present or is out of range.
	pub fn insert(&mut self, index: usize) -> bool {
		match self.mask.get_mut(index) {
			Some(included) if !*included => {
				*included = true;
				self.indices.push(index);
				true
			}
			_ => false,
		}
	}

	/// Returns false if `index` was not present.
	pub fn remove(&mut self, index: usize) -> bool {
		match self.mask.get_mut(index) {
			Some(included) if *included => {
				*included = false;
				self.indices.retain(|other| *other != index);
				true
			}
			_ => false,
		}
	}

	pub fn clear(&mut self) {
		for index in self.indices.drain(..) {
			self.mask[index] = false;
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
	Asc,
	Desc,
}

/// Ordered sort keys, most significant first.
pub type SortSpec = Vec<(String, SortDirection)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatsKind {
	Full,
	Filtered,
	Selected,
}

/// Per column stats over all rows, over the filtered rows and over the selected rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnStatsTables {
	pub full: Arc<StatsMap>,
	pub filtered: Arc<StatsMap>,
	pub selected: Arc<StatsMap>,
}

impl ColumnStatsTables {
	pub fn get(&self, kind: StatsKind) -> &StatsMap {
		match kind {
			StatsKind::Full => &self.full,
			StatsKind::Filtered => &self.filtered,
			StatsKind::Selected => &self.selected,
		}
	}
}

/// The transfer functions of one column, derived from all rows and from the filtered rows.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnTransferFunctions {
	pub full: TransferFunction,
	pub filtered: TransferFunction,
}

/// This struct is an immutable snapshot of the dataset store. Large fields are shared between snapshots, so cloning one is cheap.
#[derive(Clone, Debug, Default)]
pub struct DatasetState {
	pub uid: Option<String>,
	pub generation_id: u64,
	pub filename: Option<String>,
	/// The length of the longest column.
	pub length: usize,
	pub columns: Arc<Vec<Column>>,
	pub column_data: Arc<DataFrame>,
	pub filters: Arc<Vec<Filter>>,
	pub filtered: Arc<RowSet>,
	pub selected: Arc<RowSet>,
	pub highlighted: Arc<RowSet>,
	pub sort: Arc<SortSpec>,
	pub column_stats: ColumnStatsTables,
	pub color_transfer_functions: Arc<BTreeMap<String, ColumnTransferFunctions>>,
	pub column_relevance: Arc<Relevances>,
}

impl DatasetState {
	/// A fresh state for `table` with no filters, selection, highlight or sort. Derived fields are left for the cascade to fill in.
	pub fn from_table(table: &WireTable) -> DatasetState {
		let (columns, column_data) = DataFrame::from_wire(table);
		let length = column_data.len();
		DatasetState {
			uid: Some(table.uid.clone()),
			generation_id: table.generation_id,
			filename: Some(table.filename.clone()),
			length,
			columns: Arc::new(columns),
			column_data: Arc::new(column_data),
			filters: Arc::new(Vec::new()),
			filtered: Arc::new(RowSet::all(length)),
			selected: Arc::new(RowSet::empty(length)),
			highlighted: Arc::new(RowSet::empty(length)),
			sort: Arc::new(Vec::new()),
			column_stats: ColumnStatsTables::default(),
			color_transfer_functions: Arc::new(BTreeMap::new()),
			column_relevance: Arc::new(BTreeMap::new()),
		}
	}

	pub fn column(&self, key: &str) -> Option<&Column> {
		self.columns.iter().find(|column| column.key == key)
	}

	pub fn column_stats(&self, kind: StatsKind, key: &str) -> Option<&DataStatistics> {
		self.column_stats.get(kind).get(key)
	}

	/// The filtered row positions ordered by the sort spec. Ties keep their ascending order and missing values sort last in either direction.
	pub fn sorted_indices(&self) -> Vec<usize> {
		let mut indices = self.filtered.indices().to_vec();
		let keys: Vec<_> = self
			.sort
			.iter()
			.filter_map(|(key, direction)| Some((self.column_data.get(key)?, *direction)))
			.collect();
		if keys.is_empty() {
			return indices;
		}
		indices.sort_by(|a, b| {
			for (data, direction) in keys.iter() {
				let ordering = match (data.scalar_at(*a), data.scalar_at(*b)) {
					(Some(a), Some(b)) => {
						let ordering = a.compare(&b).unwrap_or(Ordering::Equal);
						match direction {
							SortDirection::Asc => ordering,
							SortDirection::Desc => ordering.reverse(),
						}
					}
					(Some(_), None) => Ordering::Less,
					(None, Some(_)) => Ordering::Greater,
					(None, None) => Ordering::Equal,
				};
				if ordering != Ordering::Equal {
					return ordering;
				}
			}
			Ordering::Equal
		});
		indices
	}
}

#[test]
fn test_row_set_keeps_mask_and_indices_in_sync() {
	let mut set = RowSet::from_indices(vec![3, 1, 3, 9], 5);
	assert_eq!(set.indices(), &[3, 1]);
	assert_eq!(set.mask(), &[false, true, false, true, false]);
	assert!(set.insert(0));
	assert!(!set.insert(0));
	assert!(!set.insert(5));
	assert!(set.remove(3));
	assert!(!set.remove(3));
	assert_eq!(set.indices(), &[1, 0]);
	assert_eq!(set.mask(), &[true, true, false, false, false]);
	set.clear();
	assert!(set.is_empty());
	assert_eq!(set.mask(), &[false; 5]);
	let from_mask = RowSet::from_mask(vec![false, true, true]);
	assert_eq!(from_mask.indices(), &[1, 2]);
}

#[test]
fn test_sorted_indices() {
	use maplit::btreemap;
	use spotlight_dataframe::{ColumnData, DataType};
	let nan = std::f64::NAN;
	let column_data = DataFrame::from_columns(btreemap! {
		"group".to_owned() => ColumnData::Int(vec![Some(1), Some(0), Some(1), Some(0), None]),
		"value".to_owned() => ColumnData::Float(vec![2.0, 5.0, 1.0, nan, 3.0]),
	});
	let mut state = DatasetState {
		length: 5,
		columns: Arc::new(vec![
			Column::new("group", DataType::Int),
			Column::new("value", DataType::Float),
		]),
		column_data: Arc::new(column_data),
		filtered: Arc::new(RowSet::all(5)),
		..Default::default()
	};
	assert_eq!(state.sorted_indices(), vec![0, 1, 2, 3, 4]);
	state.sort = Arc::new(vec![("value".to_owned(), SortDirection::Desc)]);
	assert_eq!(state.sorted_indices(), vec![1, 4, 0, 2, 3]);
	state.sort = Arc::new(vec![
		("group".to_owned(), SortDirection::Asc),
		("value".to_owned(), SortDirection::Asc),
	]);
	assert_eq!(state.sorted_indices(), vec![1, 3, 2, 0, 4]);
}
