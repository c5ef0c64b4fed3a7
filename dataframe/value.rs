use num_traits::ToPrimitive;
use ordered_float::NotNan;
use std::cmp::Ordering;

/// A single non-missing cell value of a scalar column.
///
/// Values of one column always share a variant, so the derived ordering is the natural ordering of the column. Floats are wrapped in `NotNan`, which makes the ordering total. Infinities are ordinary values.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarValue {
	Bool(bool),
	Int(i64),
	Float(NotNan<f64>),
	Str(String),
}

impl ScalarValue {
	/// Returns `None` for NaN.
	pub fn float(value: f64) -> Option<Self> {
		NotNan::new(value).ok().map(ScalarValue::Float)
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			ScalarValue::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
			ScalarValue::Int(value) => value.to_f64(),
			ScalarValue::Float(value) => Some(value.into_inner()),
			ScalarValue::Str(_) => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			ScalarValue::Str(value) => Some(value),
			_ => None,
		}
	}

	/// Compare two values, treating ints and floats as numbers. Returns `None` if the values are not comparable.
	pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
		match (self, other) {
			(ScalarValue::Str(a), ScalarValue::Str(b)) => Some(a.cmp(b)),
			(ScalarValue::Bool(a), ScalarValue::Bool(b)) => Some(a.cmp(b)),
			(ScalarValue::Int(a), ScalarValue::Int(b)) => Some(a.cmp(b)),
			(ScalarValue::Str(_), _) | (_, ScalarValue::Str(_)) => None,
			(ScalarValue::Bool(_), _) | (_, ScalarValue::Bool(_)) => None,
			(a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
		}
	}

	/// Convert a JSON scalar. Arrays, objects and null have no scalar value.
	pub fn from_json(value: &serde_json::Value) -> Option<Self> {
		match value {
			serde_json::Value::Bool(value) => Some(ScalarValue::Bool(*value)),
			serde_json::Value::Number(number) => match number.as_i64() {
				Some(value) => Some(ScalarValue::Int(value)),
				None => number.as_f64().and_then(ScalarValue::float),
			},
			serde_json::Value::String(value) => Some(ScalarValue::Str(value.clone())),
			serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
				None
			}
		}
	}
}

impl std::fmt::Display for ScalarValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ScalarValue::Bool(value) => write!(f, "{}", value),
			ScalarValue::Int(value) => write!(f, "{}", value),
			ScalarValue::Float(value) => write!(f, "{}", value),
			ScalarValue::Str(value) => write!(f, "{}", value),
		}
	}
}

#[test]
fn test_compare_mixes_ints_and_floats() {
	let a = ScalarValue::Int(2);
	let b = ScalarValue::float(2.5).unwrap();
	assert_eq!(a.compare(&b), Some(Ordering::Less));
	assert_eq!(a.compare(&ScalarValue::Str("2".to_owned())), None);
}

#[test]
fn test_infinity_is_a_value() {
	let infinity = ScalarValue::float(f64::INFINITY).unwrap();
	assert!(ScalarValue::float(f64::NAN).is_none());
	assert!(ScalarValue::float(f64::NEG_INFINITY).unwrap() < ScalarValue::float(-1e300).unwrap());
	assert_eq!(infinity.compare(&ScalarValue::Int(i64::MAX)), Some(Ordering::Greater));
}

#[test]
fn test_from_json() {
	assert_eq!(
		ScalarValue::from_json(&serde_json::json!(3)),
		Some(ScalarValue::Int(3))
	);
	assert_eq!(
		ScalarValue::from_json(&serde_json::json!("a")),
		Some(ScalarValue::Str("a".to_owned()))
	);
	assert_eq!(ScalarValue::from_json(&serde_json::Value::Null), None);
}
