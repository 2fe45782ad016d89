use super::font::FontRef;
use super::params::ImageParams;
use super::surface::{Rasterizer, Surface, TextStyle};
use super::{Align, Color};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// One recorded drawing operation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Fill {
        color: Color,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        font: FontRef,
        align: Align,
        color: Color,
        size: u16,
        bg: Color,
    },
    Rect {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: Color,
    },
    Line {
        from: (i32, i32),
        to: (i32, i32),
        color: Color,
    },
    Triangle {
        points: [(i32, i32); 3],
        color: Color,
    },
}

#[derive(Serialize, Deserialize)]
struct DisplayListBuffer {
    width: u16,
    height: u16,
    bpp: u8,
    buffer_bpp: u8,
    ops: Vec<DrawOp>,
}

/// Rasterizer that records drawing operations instead of pixels.
///
/// The buffer handed to the transport is the JSON-encoded operation list,
/// for devices or relays that rasterize themselves. `with_max_bpp` makes
/// deeper surfaces fail to allocate.
pub struct DisplayListRasterizer {
    max_bpp: u8,
    created: AtomicUsize,
}

impl DisplayListRasterizer {
    pub fn new() -> Self {
        Self::with_max_bpp(8)
    }

    pub fn with_max_bpp(max_bpp: u8) -> Self {
        Self {
            max_bpp,
            created: AtomicUsize::new(0),
        }
    }

    /// Number of surfaces successfully allocated
    pub fn surfaces_created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Operations of a buffer produced by this rasterizer
    pub fn decode(buffer: &[u8]) -> Option<Vec<DrawOp>> {
        serde_json::from_slice::<DisplayListBuffer>(buffer)
            .ok()
            .map(|b| b.ops)
    }
}

impl Default for DisplayListRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for DisplayListRasterizer {
    fn create_surface(&self, width: u16, height: u16, bpp: u8) -> Option<Box<dyn Surface>> {
        if bpp > self.max_bpp || width == 0 || height == 0 {
            return None;
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        Some(Box::new(DisplayList {
            width,
            height,
            bpp,
            ops: Vec::new(),
        }))
    }
}

struct DisplayList {
    width: u16,
    height: u16,
    bpp: u8,
    ops: Vec<DrawOp>,
}

impl Surface for DisplayList {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn bpp(&self) -> u8 {
        self.bpp
    }

    fn fill(&mut self, color: Color) {
        // A fill hides everything drawn before it
        self.ops.clear();
        self.ops.push(DrawOp::Fill { color });
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, style: &TextStyle) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            font: style.font.clone(),
            align: style.align,
            color: style.color,
            size: style.size,
            bg: style.bg,
        });
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        self.ops.push(DrawOp::Rect { x, y, w, h, color });
    }

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Color) {
        self.ops.push(DrawOp::Line { from, to, color });
    }

    fn fill_triangle(&mut self, points: [(i32, i32); 3], color: Color) {
        self.ops.push(DrawOp::Triangle { points, color });
    }

    fn to_buffer(&self, params: &ImageParams) -> Vec<u8> {
        let buffer = DisplayListBuffer {
            width: self.width,
            height: self.height,
            bpp: self.bpp,
            buffer_bpp: params.buffer_bpp,
            ops: self.ops.clone(),
        };
        serde_json::to_vec(&buffer).unwrap_or_default()
    }
}
