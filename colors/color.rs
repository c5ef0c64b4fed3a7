/// An 8 bit per channel RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: u8,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 255 }
	}

	/// Parse `#rrggbb` or `#rrggbbaa`. The leading `#` is optional.
	pub fn from_hex(hex: &str) -> Option<Self> {
		let hex = hex.trim().trim_start_matches('#');
		let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
		match hex.len() {
			6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
			8 => Some(Self {
				r: channel(0)?,
				g: channel(2)?,
				b: channel(4)?,
				a: channel(6)?,
			}),
			_ => None,
		}
	}

	pub fn to_hex(self) -> String {
		if self.a == 255 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
		}
	}

	/// Linear interpolation between `self` at `t = 0` and `other` at `t = 1`.
	pub fn lerp(self, other: Color, t: f64) -> Color {
		let t = if t.is_nan() { 0.0 } else { t.max(0.0).min(1.0) };
		let lerp = |x: u8, y: u8| -> u8 {
			(f64::from(x) + (f64::from(y) - f64::from(x)) * t).round() as u8
		};
		Color {
			r: lerp(self.r, other.r),
			g: lerp(self.g, other.g),
			b: lerp(self.b, other.b),
			a: lerp(self.a, other.a),
		}
	}
}

impl std::fmt::Display for Color {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

#[test]
fn test_hex() {
	let color = Color::from_hex("#1f77b4").unwrap();
	assert_eq!(color, Color::rgb(0x1f, 0x77, 0xb4));
	assert_eq!(color.to_hex(), "#1f77b4");
	assert_eq!(Color::from_hex("00000022").unwrap().a, 0x22);
	assert_eq!(Color::from_hex("#12345"), None);
}

#[test]
fn test_lerp() {
	let black = Color::rgb(0, 0, 0);
	let white = Color::rgb(255, 255, 255);
	assert_eq!(black.lerp(white, 0.5), Color::rgb(128, 128, 128));
	assert_eq!(black.lerp(white, 2.0), white);
	assert_eq!(black.lerp(white, -1.0), black);
}
