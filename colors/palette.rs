use crate::color::Color;
use once_cell::sync::Lazy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteKind {
	Categorical,
	Continuous,
	Constant,
}

/// A named list of colors. Categorical palettes are indexed by class, continuous palettes are interpolated between their stops and constant palettes use their first color.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
	pub name: &'static str,
	pub kind: PaletteKind,
	pub colors: Vec<Color>,
}

/// The color of missing values and values outside a categorical domain.
pub const NO_DATA_COLOR: Color = Color::rgb(0xc0, 0xc0, 0xc0);

static PALETTES: Lazy<Vec<Palette>> = Lazy::new(|| {
	let palette = |name: &'static str, kind: PaletteKind, colors: &[&str]| Palette {
		name,
		kind,
		colors: colors.iter().filter_map(|hex| Color::from_hex(hex)).collect(),
	};
	vec![
		palette(
			"Tableau10",
			PaletteKind::Categorical,
			&[
				"#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1",
				"#ff9da7", "#9c755f", "#bab0ab",
			],
		),
		palette(
			"Set2",
			PaletteKind::Categorical,
			&[
				"#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3", "#a6d854", "#ffd92f", "#e5c494",
				"#b3b3b3",
			],
		),
		palette(
			"Viridis",
			PaletteKind::Continuous,
			&[
				"#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779",
				"#6ece58", "#b5de2b", "#fde725",
			],
		),
		palette(
			"Grays",
			PaletteKind::Continuous,
			&["#f0f0f0", "#252525"],
		),
		palette("Blue", PaletteKind::Constant, &["#4e79a7"]),
		palette("Gray", PaletteKind::Constant, &["#9e9e9e"]),
	]
});

/// Look up a palette by name. Unknown names fall back to the first palette of the requested kind.
pub fn palette(name: &str, kind: PaletteKind) -> &'static Palette {
	let palettes = &*PALETTES;
	if let Some(palette) = palettes
		.iter()
		.find(|palette| palette.kind == kind && palette.name.eq_ignore_ascii_case(name))
	{
		return palette;
	}
	log::warn!("unknown {:?} palette {:?}", kind, name);
	palettes
		.iter()
		.find(|palette| palette.kind == kind)
		.unwrap_or(&palettes[0])
}

impl Palette {
	/// The number of classes a categorical palette distinguishes.
	pub fn class_count(&self) -> usize {
		self.colors.len().max(1)
	}

	pub fn class_color(&self, class: usize) -> Color {
		self.colors
			.get(class % self.class_count())
			.copied()
			.unwrap_or(NO_DATA_COLOR)
	}

	/// The color at `t` in `[0, 1]`, interpolated between neighboring stops.
	pub fn interpolate(&self, t: f64) -> Color {
		match self.colors.len() {
			0 => NO_DATA_COLOR,
			1 => self.colors[0],
			n => {
				let t = if t.is_nan() { 0.0 } else { t.max(0.0).min(1.0) };
				let position = t * (n - 1) as f64;
				let index = (position.floor() as usize).min(n - 2);
				self.colors[index].lerp(self.colors[index + 1], position - index as f64)
			}
		}
	}
}

#[test]
fn test_palette_lookup_falls_back() {
	assert_eq!(palette("viridis", PaletteKind::Continuous).name, "Viridis");
	assert_eq!(palette("nope", PaletteKind::Categorical).name, "Tableau10");
	assert_eq!(palette("Viridis", PaletteKind::Categorical).name, "Tableau10");
}

#[test]
fn test_interpolate_endpoints() {
	let grays = palette("Grays", PaletteKind::Continuous);
	assert_eq!(grays.interpolate(0.0).to_hex(), "#f0f0f0");
	assert_eq!(grays.interpolate(1.0).to_hex(), "#252525");
	assert_eq!(grays.interpolate(7.0).to_hex(), "#252525");
}

#[test]
fn test_class_color_wraps() {
	let set2 = palette("Set2", PaletteKind::Categorical);
	assert_eq!(set2.class_count(), 8);
	assert_eq!(set2.class_color(9), set2.class_color(1));
}
