// Template substitution and draw-element streams

mod elements;
mod json_path;
mod stream;

pub use elements::{decode_elements, parse_color, DrawElement, TextElement};
pub use json_path::extract;
pub use stream::{TemplateStream, LOOKAHEAD};
