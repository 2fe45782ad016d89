// Rendering collaborators: surfaces, image codec and per-dispatch image parameters

mod codec;
mod display_list;
mod font;
mod params;
mod surface;

pub use codec::{DitherCodec, ImageCodec};
pub use display_list::{DisplayListRasterizer, DrawOp};
pub use font::{resolve_font, FontRef};
pub use params::ImageParams;
pub use surface::{draw_element, draw_text, init_surface, Rasterizer, Surface, TextStyle};

use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// RGB565 color
pub type Color = u16;

pub mod color {
    use super::Color;

    pub const WHITE: Color = 0xFFFF;
    pub const BLACK: Color = 0x0000;
    pub const RED: Color = 0xF800;
}

/// Horizontal text alignment relative to the anchor point
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// Map a text datum (0 top-left, 1 top-center, 2 top-right)
    pub fn from_datum(datum: i32) -> Self {
        match datum {
            1 => Align::Center,
            2 => Align::Right,
            _ => Align::Left,
        }
    }
}
