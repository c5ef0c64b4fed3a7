/*!
This module defines the table payload as it arrives from the table service.
*/

use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTable {
	pub uid: String,
	pub generation_id: u64,
	#[serde(default)]
	pub filename: String,
	#[serde(default)]
	pub columns: Vec<WireColumn>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct WireColumn {
	pub name: String,
	pub role: String,
	/// Element kind of `Sequence` columns.
	#[serde(default)]
	pub dtype: Option<String>,
	#[serde(default)]
	pub optional: bool,
	#[serde(default)]
	pub editable: bool,
	#[serde(default)]
	pub hidden: bool,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub tags: BTreeSet<String>,
	#[serde(default)]
	pub categories: Option<BTreeMap<String, i32>>,
	/// Absent for lazily loaded columns.
	#[serde(default)]
	pub values: Option<Vec<serde_json::Value>>,
}

#[test]
fn test_deserialize_wire_table() {
	let table: WireTable = serde_json::from_str(
		r#"{
			"uid": "abc",
			"generationId": 3,
			"filename": "data.h5",
			"columns": [
				{ "name": "x", "role": "float", "values": [1.0, null] },
				{ "name": "label", "role": "Category", "categories": { "cat": 0, "dog": 1 } }
			]
		}"#,
	)
	.unwrap();
	assert_eq!(table.generation_id, 3);
	assert_eq!(table.columns.len(), 2);
	assert_eq!(table.columns[0].values.as_ref().map(|v| v.len()), Some(2));
	assert!(table.columns[1].values.is_none());
	assert_eq!(
		table.columns[1].categories.as_ref().and_then(|c| c.get("dog")),
		Some(&1)
	);
}
