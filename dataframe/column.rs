use crate::wire::WireColumn;
use std::collections::{BTreeMap, BTreeSet};

/// This enum describes the kind of values a column holds.
#[derive(Clone, Debug, PartialEq)]
pub enum DataType {
	Int,
	Float,
	Bool,
	Str,
	Datetime,
	Array,
	Category {
		categories: BTreeMap<String, i32>,
		inverted_categories: BTreeMap<i32, String>,
	},
	Window,
	Mesh,
	Image,
	Audio,
	Video,
	Sequence1D,
	Sequence {
		dtype: Box<DataType>,
	},
	BoundingBox,
	Embedding,
	Unknown,
}

impl DataType {
	/// Map a wire role to a data type. Unrecognized roles become `Unknown`.
	pub fn from_role(
		role: &str,
		dtype: Option<&str>,
		categories: Option<&BTreeMap<String, i32>>,
	) -> Self {
		match role.to_ascii_lowercase().as_str() {
			"int" => DataType::Int,
			"float" => DataType::Float,
			"bool" => DataType::Bool,
			"str" => DataType::Str,
			"datetime" => DataType::Datetime,
			"array" => DataType::Array,
			"category" => DataType::category(categories.cloned().unwrap_or_default()),
			"window" => DataType::Window,
			"mesh" => DataType::Mesh,
			"image" => DataType::Image,
			"audio" => DataType::Audio,
			"video" => DataType::Video,
			"sequence1d" => DataType::Sequence1D,
			"sequence" => DataType::Sequence {
				dtype: Box::new(
					dtype
						.map(|dtype| DataType::from_role(dtype, None, None))
						.unwrap_or(DataType::Unknown),
				),
			},
			"boundingbox" => DataType::BoundingBox,
			"embedding" => DataType::Embedding,
			_ => DataType::Unknown,
		}
	}

	pub fn category(categories: BTreeMap<String, i32>) -> Self {
		let inverted_categories = categories
			.iter()
			.map(|(name, code)| (*code, name.clone()))
			.collect();
		DataType::Category {
			categories,
			inverted_categories,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			DataType::Int => "int",
			DataType::Float => "float",
			DataType::Bool => "bool",
			DataType::Str => "str",
			DataType::Datetime => "datetime",
			DataType::Array => "array",
			DataType::Category { .. } => "Category",
			DataType::Window => "Window",
			DataType::Mesh => "Mesh",
			DataType::Image => "Image",
			DataType::Audio => "Audio",
			DataType::Video => "Video",
			DataType::Sequence1D => "Sequence1D",
			DataType::Sequence { .. } => "Sequence",
			DataType::BoundingBox => "BoundingBox",
			DataType::Embedding => "Embedding",
			DataType::Unknown => "Unknown",
		}
	}

	/// Kinds the statistics engine computes stats for.
	pub fn is_numeric(&self) -> bool {
		match self {
			DataType::Int | DataType::Float | DataType::Category { .. } => true,
			DataType::Bool
			| DataType::Str
			| DataType::Datetime
			| DataType::Array
			| DataType::Window
			| DataType::Mesh
			| DataType::Image
			| DataType::Audio
			| DataType::Video
			| DataType::Sequence1D
			| DataType::Sequence { .. }
			| DataType::BoundingBox
			| DataType::Embedding
			| DataType::Unknown => false,
		}
	}

	/// Kinds that get color transfer functions.
	pub fn is_scalar_or_categorical(&self) -> bool {
		match self {
			DataType::Int
			| DataType::Float
			| DataType::Bool
			| DataType::Str
			| DataType::Category { .. } => true,
			DataType::Datetime
			| DataType::Array
			| DataType::Window
			| DataType::Mesh
			| DataType::Image
			| DataType::Audio
			| DataType::Video
			| DataType::Sequence1D
			| DataType::Sequence { .. }
			| DataType::BoundingBox
			| DataType::Embedding
			| DataType::Unknown => false,
		}
	}

	/// Returns `(binary, lazy)`.
	pub fn flags(&self) -> (bool, bool) {
		match self {
			DataType::Int
			| DataType::Float
			| DataType::Bool
			| DataType::Datetime
			| DataType::Window
			| DataType::BoundingBox
			| DataType::Category { .. }
			| DataType::Unknown => (false, false),
			DataType::Str | DataType::Array | DataType::Embedding | DataType::Sequence { .. } => {
				(false, true)
			}
			DataType::Image
			| DataType::Video
			| DataType::Audio
			| DataType::Mesh
			| DataType::Sequence1D => (true, true),
		}
	}
}

/// This struct describes a column. It is built once per fetch and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
	pub key: String,
	pub name: String,
	pub data_type: DataType,
	pub editable: bool,
	pub optional: bool,
	pub hidden: bool,
	pub lazy: bool,
	pub binary: bool,
	pub tags: BTreeSet<String>,
	pub description: String,
}

impl Column {
	pub fn new(key: impl Into<String>, data_type: DataType) -> Self {
		let key = key.into();
		let (binary, lazy) = data_type.flags();
		Self {
			name: key.clone(),
			key,
			data_type,
			editable: false,
			optional: false,
			hidden: false,
			lazy,
			binary,
			tags: BTreeSet::new(),
			description: String::new(),
		}
	}

	pub fn from_wire(column: &WireColumn) -> Self {
		let data_type = DataType::from_role(
			&column.role,
			column.dtype.as_deref(),
			column.categories.as_ref(),
		);
		let (binary, lazy) = data_type.flags();
		Self {
			key: column.name.clone(),
			name: column.name.clone(),
			data_type,
			editable: column.editable,
			optional: column.optional,
			hidden: column.hidden,
			lazy,
			binary,
			tags: column.tags.clone(),
			description: column.description.clone().unwrap_or_default(),
		}
	}

	/// Columns the backend adds for its own bookkeeping, such as `__idx__`.
	pub fn is_internal(&self) -> bool {
		self.key.starts_with("__") && self.key.ends_with("__")
	}
}

#[test]
fn test_column_flags() {
	let image = Column::new("image", DataType::from_role("Image", None, None));
	assert!(image.binary && image.lazy);
	let text = Column::new("text", DataType::from_role("str", None, None));
	assert!(!text.binary && text.lazy);
	let value = Column::new("value", DataType::from_role("float", None, None));
	assert!(!value.binary && !value.lazy);
}

#[test]
fn test_unknown_role_degrades_to_unknown() {
	assert_eq!(DataType::from_role("Hologram", None, None), DataType::Unknown);
}

#[test]
fn test_category_inverted_categories() {
	use maplit::btreemap;
	let data_type = DataType::from_role(
		"Category",
		None,
		Some(&btreemap! { "cat".to_owned() => 0, "dog".to_owned() => 1 }),
	);
	match data_type {
		DataType::Category {
			inverted_categories,
			..
		} => {
			assert_eq!(
				inverted_categories,
				btreemap! { 0 => "cat".to_owned(), 1 => "dog".to_owned() }
			);
		}
		_ => panic!("expected a category"),
	}
}

#[test]
fn test_sequence_dtype() {
	let data_type = DataType::from_role("Sequence", Some("float"), None);
	assert_eq!(
		data_type,
		DataType::Sequence {
			dtype: Box::new(DataType::Float)
		}
	);
}

#[test]
fn test_from_wire() {
	let column = Column::from_wire(&WireColumn {
		name: "__idx__".to_owned(),
		role: "int".to_owned(),
		hidden: true,
		..Default::default()
	});
	assert!(column.is_internal());
	assert!(column.hidden);
	assert_eq!(column.data_type, DataType::Int);
}
