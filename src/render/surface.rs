use super::font::{resolve_font, FontRef};
use super::params::ImageParams;
use super::{color, Align, Color};
use crate::template::{DrawElement, TextElement};
use crate::vars::VariableStore;
use tracing::{error, warn};

/// How a string is drawn
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    pub font: FontRef,
    pub align: Align,
    pub color: Color,
    pub size: u16,
    pub bg: Color,
}

/// A drawing target allocated by a [`Rasterizer`]
pub trait Surface: Send {
    fn width(&self) -> u16;
    fn height(&self) -> u16;
    fn bpp(&self) -> u8;

    fn fill(&mut self, color: Color);
    fn draw_text(&mut self, text: &str, x: i32, y: i32, style: &TextStyle);
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color);
    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Color);
    fn fill_triangle(&mut self, points: [(i32, i32); 3], color: Color);

    /// Encode the surface for the transport
    fn to_buffer(&self, params: &ImageParams) -> Vec<u8>;
}

/// Allocates drawing surfaces.
///
/// Allocation failure is reported as `None`, never as a panic.
pub trait Rasterizer: Send + Sync {
    fn create_surface(&self, width: u16, height: u16, bpp: u8) -> Option<Box<dyn Surface>>;
}

/// Allocate a white surface for `params`, degrading to 1 bpp once if the
/// 8 bpp allocation fails.
pub fn init_surface(
    rasterizer: &dyn Rasterizer,
    params: &mut ImageParams,
) -> Option<Box<dyn Surface>> {
    let surface = rasterizer
        .create_surface(params.width, params.height, 8)
        .or_else(|| {
            warn!(
                width = params.width,
                height = params.height,
                "Low on memory, falling back to 1bpp surface"
            );
            params.buffer_bpp = 1;
            rasterizer.create_surface(params.width, params.height, 1)
        });

    match surface {
        Some(mut surface) => {
            surface.fill(color::WHITE);
            Some(surface)
        }
        None => {
            error!(
                width = params.width,
                height = params.height,
                "Failed to create surface"
            );
            None
        }
    }
}

/// Draw a text element, expanding `{name}` variables first
pub fn draw_text(surface: &mut dyn Surface, vars: &VariableStore, text: &TextElement) {
    let content = vars.expand_inline(&text.content);
    let style = TextStyle {
        font: resolve_font(&text.font),
        align: text.align,
        color: text.color,
        size: text.size,
        bg: text.bg,
    };
    surface.draw_text(&content, text.x, text.y, &style);
}

pub fn draw_element(surface: &mut dyn Surface, vars: &VariableStore, element: &DrawElement) {
    match element {
        DrawElement::Text(text) => draw_text(surface, vars, text),
        DrawElement::Box { x, y, w, h, color } => surface.fill_rect(*x, *y, *w, *h, *color),
        DrawElement::Line {
            x1,
            y1,
            x2,
            y2,
            color,
        } => surface.draw_line((*x1, *y1), (*x2, *y2), *color),
        DrawElement::Triangle { points, color } => surface.fill_triangle(*points, *color),
    }
}
