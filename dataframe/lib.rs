/*!
This crate holds the in-memory table of the dataset store: immutable [`Column`](struct.Column.html) descriptors and a [`DataFrame`](struct.DataFrame.html) mapping each column key to a dense, typed array of cell values. Rows are identified purely by their position.
*/

#![allow(clippy::tabs_in_doc_comments)]

use num_traits::ToPrimitive;
use std::collections::BTreeMap;

mod column;
mod value;
mod wire;

pub use self::column::{Column, DataType};
pub use self::value::ScalarValue;
pub use self::wire::{WireColumn, WireTable};

/// This enum holds the cell values of a single column.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
	Int(Vec<Option<i64>>),
	/// NaN marks a missing value.
	Float(Vec<f64>),
	Bool(Vec<bool>),
	Str(Vec<String>),
	/// Milliseconds since the unix epoch.
	Datetime(Vec<Option<i64>>),
	/// Category codes.
	Category(Vec<Option<i32>>),
	Values(Vec<serde_json::Value>),
}

impl ColumnData {
	pub fn len(&self) -> usize {
		match self {
			ColumnData::Int(data) => data.len(),
			ColumnData::Float(data) => data.len(),
			ColumnData::Bool(data) => data.len(),
			ColumnData::Str(data) => data.len(),
			ColumnData::Datetime(data) => data.len(),
			ColumnData::Category(data) => data.len(),
			ColumnData::Values(data) => data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// The value at `row` as a number, or `None` if it is missing, NaN or not numeric.
	pub fn numeric_at(&self, row: usize) -> Option<f64> {
		let value = match self {
			ColumnData::Int(data) => data.get(row).copied().flatten()?.to_f64(),
			ColumnData::Float(data) => data.get(row).copied(),
			ColumnData::Bool(data) => data.get(row).map(|value| if *value { 1.0 } else { 0.0 }),
			ColumnData::Str(_) => None,
			ColumnData::Datetime(data) => data.get(row).copied().flatten()?.to_f64(),
			ColumnData::Category(data) => data.get(row).copied().flatten()?.to_f64(),
			ColumnData::Values(data) => data.get(row)?.as_f64(),
		}?;
		if value.is_nan() {
			None
		} else {
			Some(value)
		}
	}

	/// The value at `row` as a scalar, or `None` if it is missing or not a scalar.
	pub fn scalar_at(&self, row: usize) -> Option<ScalarValue> {
		match self {
			ColumnData::Int(data) => data.get(row).copied().flatten().map(ScalarValue::Int),
			ColumnData::Float(data) => data.get(row).copied().and_then(ScalarValue::float),
			ColumnData::Bool(data) => data.get(row).copied().map(ScalarValue::Bool),
			ColumnData::Str(data) => data.get(row).cloned().map(ScalarValue::Str),
			ColumnData::Datetime(data) => data.get(row).copied().flatten().map(ScalarValue::Int),
			ColumnData::Category(data) => data
				.get(row)
				.copied()
				.flatten()
				.map(|code| ScalarValue::Int(code.into())),
			ColumnData::Values(data) => data.get(row).and_then(ScalarValue::from_json),
		}
	}

	/// The value at `row` as JSON.
	pub fn json_at(&self, row: usize) -> Option<serde_json::Value> {
		if row >= self.len() {
			return None;
		}
		let value = match self {
			ColumnData::Values(data) => data[row].clone(),
			ColumnData::Float(data) => serde_json::Number::from_f64(data[row])
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			_ => match self.scalar_at(row) {
				Some(ScalarValue::Bool(value)) => serde_json::Value::Bool(value),
				Some(ScalarValue::Int(value)) => serde_json::Value::from(value),
				Some(ScalarValue::Float(value)) => serde_json::Value::from(value.into_inner()),
				Some(ScalarValue::Str(value)) => serde_json::Value::String(value),
				None => serde_json::Value::Null,
			},
		};
		Some(value)
	}

	/// Gather the values at `indices` into a new column.
	pub fn take(&self, indices: &[usize]) -> ColumnData {
		fn take<T: Clone>(data: &[T], indices: &[usize]) -> Vec<T> {
			indices.iter().filter_map(|index| data.get(*index).cloned()).collect()
		}
		match self {
			ColumnData::Int(data) => ColumnData::Int(take(data, indices)),
			ColumnData::Float(data) => ColumnData::Float(take(data, indices)),
			ColumnData::Bool(data) => ColumnData::Bool(take(data, indices)),
			ColumnData::Str(data) => ColumnData::Str(take(data, indices)),
			ColumnData::Datetime(data) => ColumnData::Datetime(take(data, indices)),
			ColumnData::Category(data) => ColumnData::Category(take(data, indices)),
			ColumnData::Values(data) => ColumnData::Values(take(data, indices)),
		}
	}

	/// Convert wire values for a column of type `data_type`, padding with missing values up to `length`.
	pub fn from_wire(
		data_type: &DataType,
		values: Option<&[serde_json::Value]>,
		length: usize,
	) -> ColumnData {
		let values = match values {
			Some(values) => values,
			None => return ColumnData::Values(vec![serde_json::Value::Null; length]),
		};
		let get = |row: usize| values.get(row).unwrap_or(&serde_json::Value::Null);
		match data_type {
			DataType::Int => ColumnData::Int((0..length).map(|row| json_to_int(get(row))).collect()),
			DataType::Float => ColumnData::Float(
				(0..length)
					.map(|row| get(row).as_f64().unwrap_or(std::f64::NAN))
					.collect(),
			),
			DataType::Bool => ColumnData::Bool(
				(0..length)
					.map(|row| get(row).as_bool().unwrap_or(false))
					.collect(),
			),
			DataType::Str => ColumnData::Str(
				(0..length)
					.map(|row| match get(row) {
						serde_json::Value::String(value) => value.clone(),
						serde_json::Value::Null => String::new(),
						value => value.to_string(),
					})
					.collect(),
			),
			DataType::Datetime => ColumnData::Datetime(
				(0..length)
					.map(|row| match get(row) {
						serde_json::Value::String(value) => chrono::DateTime::parse_from_rfc3339(value)
							.ok()
							.map(|datetime| datetime.timestamp_millis()),
						value => json_to_int(value),
					})
					.collect(),
			),
			DataType::Category { categories, .. } => ColumnData::Category(
				(0..length)
					.map(|row| match get(row) {
						serde_json::Value::String(name) => categories.get(name).copied(),
						value => json_to_int(value).and_then(|code| code.to_i32()),
					})
					.collect(),
			),
			DataType::Array
			| DataType::Window
			| DataType::Mesh
			| DataType::Image
			| DataType::Audio
			| DataType::Video
			| DataType::Sequence1D
			| DataType::Sequence { .. }
			| DataType::BoundingBox
			| DataType::Embedding
			| DataType::Unknown => ColumnData::Values((0..length).map(|row| get(row).clone()).collect()),
		}
	}
}

fn json_to_int(value: &serde_json::Value) -> Option<i64> {
	match value.as_i64() {
		Some(value) => Some(value),
		None => value
			.as_f64()
			.filter(|value| value.fract() == 0.0)
			.and_then(|value| value.to_i64()),
	}
}

/// This struct maps column keys to their data. Every column has exactly `len()` rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataFrame {
	length: usize,
	columns: BTreeMap<String, ColumnData>,
}

impl DataFrame {
	pub fn new(length: usize) -> Self {
		Self {
			length,
			columns: BTreeMap::new(),
		}
	}

	/// Build a data frame from columns of possibly different lengths. The row count is the max of the column lengths.
	pub fn from_columns(columns: impl IntoIterator<Item = (String, ColumnData)>) -> Self {
		let columns: BTreeMap<String, ColumnData> = columns.into_iter().collect();
		let length = columns.values().map(|data| data.len()).max().unwrap_or(0);
		Self { length, columns }
	}

	/// Decode a wire table into column descriptors and column data.
	pub fn from_wire(table: &WireTable) -> (Vec<Column>, DataFrame) {
		let columns: Vec<Column> = table.columns.iter().map(Column::from_wire).collect();
		let length = table
			.columns
			.iter()
			.filter_map(|column| column.values.as_ref().map(|values| values.len()))
			.max()
			.unwrap_or(0);
		let data = columns
			.iter()
			.zip(table.columns.iter())
			.map(|(column, wire_column)| {
				let data = ColumnData::from_wire(
					&column.data_type,
					wire_column.values.as_deref(),
					length,
				);
				(column.key.clone(), data)
			})
			.collect();
		(columns, DataFrame { length, columns: data })
	}

	pub fn len(&self) -> usize {
		self.length
	}

	pub fn is_empty(&self) -> bool {
		self.length == 0
	}

	pub fn get(&self, key: &str) -> Option<&ColumnData> {
		self.columns.get(key)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.columns.contains_key(key)
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.columns.keys().map(|key| key.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnData)> {
		self.columns.iter().map(|(key, data)| (key.as_str(), data))
	}
}

#[test]
fn test_from_wire() {
	let table: WireTable = serde_json::from_str(
		r#"{
			"uid": "t",
			"generationId": 1,
			"columns": [
				{ "name": "count", "role": "int", "values": [1, 2, null] },
				{ "name": "score", "role": "float", "values": [0.5, null, 2] },
				{ "name": "label", "role": "Category", "categories": { "cat": 0, "dog": 1 }, "values": ["dog", 0, null] },
				{ "name": "when", "role": "datetime", "values": ["1970-01-01T00:00:01Z", 5, null] },
				{ "name": "image", "role": "Image" }
			]
		}"#,
	)
	.unwrap();
	let (columns, data) = DataFrame::from_wire(&table);
	assert_eq!(columns.len(), 5);
	assert_eq!(data.len(), 3);
	assert_eq!(
		data.get("count"),
		Some(&ColumnData::Int(vec![Some(1), Some(2), None]))
	);
	assert_eq!(
		data.get("label"),
		Some(&ColumnData::Category(vec![Some(1), Some(0), None]))
	);
	assert_eq!(
		data.get("when"),
		Some(&ColumnData::Datetime(vec![Some(1000), Some(5), None]))
	);
	assert_eq!(data.get("score").unwrap().numeric_at(1), None);
	assert_eq!(data.get("score").unwrap().numeric_at(2), Some(2.0));
	assert_eq!(data.get("image").unwrap().len(), 3);
}

#[test]
fn test_take() {
	let data = ColumnData::Str(vec!["a".to_owned(), "b".to_owned(), "c".to_owned()]);
	insta::assert_debug_snapshot!(data.take(&[2, 0, 7]), @r###"
 Str(
     [
         "c",
         "a",
     ],
 )
 "###);
}

#[test]
fn test_scalar_at() {
	let data = ColumnData::Float(vec![1.5, std::f64::NAN]);
	assert_eq!(data.scalar_at(0), ScalarValue::float(1.5));
	assert_eq!(data.scalar_at(1), None);
	assert_eq!(data.scalar_at(2), None);
}
