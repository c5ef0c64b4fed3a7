use crate::{
	color::Color,
	palette::{palette, Palette, PaletteKind, NO_DATA_COLOR},
	preferences::ColorPreferences,
};
use spotlight_dataframe::{ColumnData, DataType, ScalarValue};
use spotlight_stats::compute_stats;
use std::collections::BTreeSet;

/// This enum describes how a transfer function assigns colors.
#[derive(Clone, Debug, PartialEq)]
pub enum TransferFunctionKind {
	/// One palette class per value. `domain` is sorted and unique.
	Categorical { domain: Vec<ScalarValue> },
	/// Interpolation over `domain`, split into bands at `class_breaks` if present.
	Continuous {
		domain: (f64, f64),
		class_breaks: Option<Vec<f64>>,
	},
	/// Every value gets the same color.
	Constant { data_type: DataType },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransferFunction {
	pub kind: TransferFunctionKind,
	pub palette: &'static Palette,
}

impl TransferFunction {
	pub fn palette_name(&self) -> &'static str {
		self.palette.name
	}

	/// The color of `value`. `None` stands for a missing value.
	pub fn color(&self, value: Option<&ScalarValue>) -> Color {
		match &self.kind {
			TransferFunctionKind::Constant { .. } => self.palette.interpolate(0.0),
			TransferFunctionKind::Categorical { domain } => match value {
				Some(value) => match domain.binary_search(value) {
					Ok(class) => self.palette.class_color(class),
					Err(_) => NO_DATA_COLOR,
				},
				None => NO_DATA_COLOR,
			},
			TransferFunctionKind::Continuous {
				domain,
				class_breaks,
			} => {
				let value = match value.and_then(|value| value.as_f64()) {
					Some(value) => value,
					None => return NO_DATA_COLOR,
				};
				let t = match class_breaks {
					Some(class_breaks) if class_breaks.len() >= 2 => band_position(class_breaks, value),
					_ => domain_position(*domain, value),
				};
				self.palette.interpolate(t)
			}
		}
	}

	pub fn color_at(&self, data: &ColumnData, row: usize) -> Color {
		self.color(data.scalar_at(row).as_ref())
	}
}

fn domain_position((min, max): (f64, f64), value: f64) -> f64 {
	let width = max - min;
	if width > 0.0 {
		(value - min) / width
	} else {
		0.5
	}
}

/// Band `i` of `n` bands maps to `i / (n - 1)`, so the first and last bands get the ends of the palette.
fn band_position(class_breaks: &[f64], value: f64) -> f64 {
	let n_bands = class_breaks.len() - 1;
	if n_bands == 1 {
		return 0.5;
	}
	let band = class_breaks[1..n_bands]
		.iter()
		.filter(|edge| **edge <= value)
		.count();
	band as f64 / (n_bands - 1) as f64
}

/// Derive the transfer function for a column.
///
/// Bools and strings are always categorical. Ints and categories are categorical unless `continuous_ints` or `continuous_categories` is set. Floats, and ints or categories forced continuous, get a continuous scale over `[min, max]`, or over `[p5, p95]` if `robust` is set. Everything else, and numeric data without any valid value, is constant.
pub fn create_color_transfer_function(
	data: Option<&ColumnData>,
	data_type: Option<&DataType>,
	preferences: &ColorPreferences,
	class_breaks: Option<&[f64]>,
) -> TransferFunction {
	let data_type = match data_type {
		Some(data_type) => data_type,
		None => return constant(DataType::Unknown, preferences),
	};
	let data = match data {
		Some(data) => data,
		None => return constant(data_type.clone(), preferences),
	};
	match data_type {
		DataType::Bool | DataType::Str => categorical(data, preferences),
		DataType::Int if !preferences.continuous_ints => {
			let domain = unique_values(data);
			let capped = preferences
				.max_categorical_ints
				.map(|max| domain.len() > max)
				.unwrap_or(false);
			if capped {
				continuous(data, data_type, preferences, class_breaks)
			} else {
				categorical_over(domain, preferences)
			}
		}
		DataType::Category { .. } if !preferences.continuous_categories => {
			categorical(data, preferences)
		}
		DataType::Int | DataType::Float | DataType::Category { .. } => {
			continuous(data, data_type, preferences, class_breaks)
		}
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
		| DataType::Unknown => constant(data_type.clone(), preferences),
	}
}

fn unique_values(data: &ColumnData) -> Vec<ScalarValue> {
	let values: BTreeSet<ScalarValue> = (0..data.len()).filter_map(|row| data.scalar_at(row)).collect();
	values.into_iter().collect()
}

fn categorical(data: &ColumnData, preferences: &ColorPreferences) -> TransferFunction {
	categorical_over(unique_values(data), preferences)
}

fn categorical_over(domain: Vec<ScalarValue>, preferences: &ColorPreferences) -> TransferFunction {
	TransferFunction {
		kind: TransferFunctionKind::Categorical { domain },
		palette: palette(&preferences.categorical_palette, PaletteKind::Categorical),
	}
}

fn continuous(
	data: &ColumnData,
	data_type: &DataType,
	preferences: &ColorPreferences,
	class_breaks: Option<&[f64]>,
) -> TransferFunction {
	let stats = match compute_stats(data_type, data, None) {
		Some(stats) => stats,
		None => return constant(data_type.clone(), preferences),
	};
	let domain = if preferences.robust {
		(stats.p5, stats.p95)
	} else {
		(stats.min, stats.max)
	};
	TransferFunction {
		kind: TransferFunctionKind::Continuous {
			domain,
			class_breaks: class_breaks.map(|class_breaks| class_breaks.to_vec()),
		},
		palette: palette(&preferences.continuous_palette, PaletteKind::Continuous),
	}
}

fn constant(data_type: DataType, preferences: &ColorPreferences) -> TransferFunction {
	TransferFunction {
		kind: TransferFunctionKind::Constant { data_type },
		palette: palette(&preferences.constant_palette, PaletteKind::Constant),
	}
}

#[test]
fn test_categorical_colors_are_deterministic() {
	let data = ColumnData::Str(
		vec!["dog", "cat", "bird", "cat", "dog"]
			.into_iter()
			.map(String::from)
			.collect(),
	);
	let preferences = ColorPreferences::default();
	let a = create_color_transfer_function(Some(&data), Some(&DataType::Str), &preferences, None);
	let b = create_color_transfer_function(Some(&data), Some(&DataType::Str), &preferences, None);
	assert_eq!(a, b);
	for row in 0..data.len() {
		assert_eq!(a.color_at(&data, row), b.color_at(&data, row));
	}
	let bird = ScalarValue::Str("bird".to_owned());
	assert_eq!(a.color(Some(&bird)), a.palette.class_color(0));
	assert_eq!(
		a.color(Some(&ScalarValue::Str("fish".to_owned()))),
		NO_DATA_COLOR
	);
	insta::assert_debug_snapshot!(a.kind, @r###"
 Categorical {
     domain: [
         Str(
             "bird",
         ),
         Str(
             "cat",
         ),
         Str(
             "dog",
         ),
     ],
 }
 "###);
}

#[test]
fn test_constant_without_type_or_data() {
	let preferences = ColorPreferences::default();
	let without_type = create_color_transfer_function(None, None, &preferences, None);
	assert_eq!(
		without_type.kind,
		TransferFunctionKind::Constant {
			data_type: DataType::Unknown
		}
	);
	let without_data = create_color_transfer_function(None, Some(&DataType::Float), &preferences, None);
	assert_eq!(
		without_data.kind,
		TransferFunctionKind::Constant {
			data_type: DataType::Float
		}
	);
}

#[test]
fn test_ints_are_categorical_unless_continuous() {
	let data = ColumnData::Int((0..200).map(Some).collect());
	let mut preferences = ColorPreferences::default();
	let function = create_color_transfer_function(Some(&data), Some(&DataType::Int), &preferences, None);
	match &function.kind {
		TransferFunctionKind::Categorical { domain } => assert_eq!(domain.len(), 200),
		kind => panic!("unexpected {:?}", kind),
	}
	preferences.max_categorical_ints = Some(100);
	let capped = create_color_transfer_function(Some(&data), Some(&DataType::Int), &preferences, None);
	assert_eq!(
		capped.kind,
		TransferFunctionKind::Continuous {
			domain: (0.0, 199.0),
			class_breaks: None
		}
	);
	preferences.max_categorical_ints = None;
	preferences.continuous_ints = true;
	let continuous = create_color_transfer_function(Some(&data), Some(&DataType::Int), &preferences, None);
	assert_eq!(continuous, capped);
}

#[test]
fn test_robust_domain() {
	let data = ColumnData::Float((1..=10).map(|value| value as f64).collect());
	let preferences = ColorPreferences {
		robust: true,
		..Default::default()
	};
	let function = create_color_transfer_function(Some(&data), Some(&DataType::Float), &preferences, None);
	match function.kind {
		TransferFunctionKind::Continuous { domain, .. } => {
			assert!((domain.0 - 1.45).abs() < 1e-9);
			assert!((domain.1 - 9.55).abs() < 1e-9);
		}
		kind => panic!("unexpected {:?}", kind),
	}
}

#[test]
fn test_continuous_colors() {
	let data = ColumnData::Float(vec![0.0, 5.0, 10.0, std::f64::NAN]);
	let preferences = ColorPreferences {
		continuous_palette: "Grays".to_owned(),
		..Default::default()
	};
	let function = create_color_transfer_function(Some(&data), Some(&DataType::Float), &preferences, None);
	assert_eq!(function.color_at(&data, 0).to_hex(), "#f0f0f0");
	assert_eq!(function.color_at(&data, 2).to_hex(), "#252525");
	assert_eq!(function.color_at(&data, 3), NO_DATA_COLOR);
}

#[test]
fn test_class_breaks_band_the_scale() {
	use spotlight_stats::BinnedHistogram;
	let data = ColumnData::Float(vec![0.0, 1.0, 9.0, 10.0]);
	let preferences = ColorPreferences {
		continuous_palette: "Grays".to_owned(),
		..Default::default()
	};
	let class_breaks = BinnedHistogram::new(0.0, 10.0, 2).edges();
	let function = create_color_transfer_function(
		Some(&data),
		Some(&DataType::Float),
		&preferences,
		Some(&class_breaks),
	);
	// Values in the same band share a color.
	assert_eq!(function.color_at(&data, 0), function.color_at(&data, 1));
	assert_eq!(function.color_at(&data, 2), function.color_at(&data, 3));
	assert_eq!(function.color_at(&data, 0).to_hex(), "#f0f0f0");
	assert_eq!(function.color_at(&data, 3).to_hex(), "#252525");
}

#[test]
fn test_categories_use_codes() {
	let data = ColumnData::Category(vec![Some(2), Some(0), None, Some(2)]);
	let data_type = DataType::category(Default::default());
	let preferences = ColorPreferences::default();
	let function = create_color_transfer_function(Some(&data), Some(&data_type), &preferences, None);
	assert_eq!(
		function.kind,
		TransferFunctionKind::Categorical {
			domain: vec![ScalarValue::Int(0), ScalarValue::Int(2)]
		}
	);
	assert_eq!(function.color_at(&data, 2), NO_DATA_COLOR);
}
