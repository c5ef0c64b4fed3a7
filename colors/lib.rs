/*!
This crate maps cell values to display colors. A [`TransferFunction`](struct.TransferFunction.html) is derived per column from its data, its type and the user's [`ColorPreferences`](struct.ColorPreferences.html).
*/

#![allow(clippy::tabs_in_doc_comments)]

mod color;
mod palette;
mod preferences;
mod transfer;

pub use self::color::Color;
pub use self::palette::{palette, Palette, PaletteKind, NO_DATA_COLOR};
pub use self::preferences::{ColorPreferences, ColorPreferencesStore};
pub use self::transfer::{create_color_transfer_function, TransferFunction, TransferFunctionKind};
