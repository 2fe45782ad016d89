use serde::{Deserialize, Serialize};

/// Built-in fixed fonts, selected by name rather than path
const BUILTIN_FONTS: [&str; 3] = ["glasstown_nbp_tf", "7x14_tf", "t0_14b_tf"];

/// Where the glyphs for a text element come from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum FontRef {
    /// Rasterizer default font
    Default,
    Builtin(String),
    /// Smooth bitmap font, store path without extension
    Bitmap(String),
    TrueType(String),
}

/// Normalize a font name from a layout or draw element.
///
/// Bare names live under `/fonts/`; a `.vlw` extension is implied and
/// stripped; `.ttf` selects the TrueType renderer.
pub fn resolve_font(font: &str) -> FontRef {
    if font.is_empty() {
        return FontRef::Default;
    }
    if BUILTIN_FONTS.contains(&font) {
        return FontRef::Builtin(font.to_string());
    }

    let mut path = if font.contains('/') {
        font.to_string()
    } else {
        format!("/fonts/{}", font)
    };
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    if let Some(stripped) = path.strip_suffix(".vlw") {
        path = stripped.to_string();
    }

    if path.ends_with(".ttf") {
        FontRef::TrueType(path)
    } else {
        FontRef::Bitmap(path)
    }
}
