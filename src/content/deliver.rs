use super::{ContentServices, RenderContext};
use crate::render::{color, init_surface, resolve_font, Align, Color, Surface, TextStyle};
use crate::transport::data_type;
use anyhow::{Context, Result};
use tracing::warn;

/// What a renderer produced
pub enum Output {
    /// Text and symbols already placed in `ctx.params`
    Segments,
    Surface(Box<dyn Surface>),
    /// Encoded panel buffer
    Buffer(Vec<u8>),
}

/// Allocate a white drawing surface for the tag's panel
pub fn new_surface(ctx: &mut RenderContext, services: &ContentServices) -> Result<Box<dyn Surface>> {
    init_surface(services.rasterizer.as_ref(), &mut ctx.params)
        .context("No drawing surface available")
}

/// Send rendered content to the tag.
///
/// Image buffers are kept as the tag's current image so they can be resent
/// later. `next_checkin` is the checkin hint in minutes.
pub fn deliver(
    ctx: &mut RenderContext,
    services: &ContentServices,
    output: Output,
    next_checkin: u16,
) -> Result<()> {
    let buffer = match output {
        Output::Segments => {
            let sent = services.transport.send_segments(
                &ctx.tag.mac,
                &ctx.params.segments,
                ctx.params.symbols,
                ctx.params.invert,
                !ctx.tag.is_external,
            );
            if !sent {
                warn!(mac = %ctx.tag.mac, "Transport refused segment data");
            }
            return Ok(());
        }
        Output::Surface(surface) => {
            // A full-depth surface keeps red ink that a 1 bpp fallback drops
            if ctx.params.bpp >= 2 && ctx.params.buffer_bpp >= 8 {
                ctx.params.has_red = true;
            }
            surface.to_buffer(&ctx.params)
        }
        Output::Buffer(buffer) => buffer,
    };

    if ctx.params.has_red {
        ctx.params.data_type = data_type::IMG_RAW_2BPP;
    }

    let path = ctx.current_image_path();
    services
        .store
        .write(&path, &buffer)
        .with_context(|| format!("Failed to store image for {}", ctx.tag.mac))?;

    if !services
        .transport
        .send_image(&ctx.tag.mac, ctx.params.data_type, &buffer, next_checkin)
    {
        warn!(mac = %ctx.tag.mac, "Transport refused image data");
    }
    Ok(())
}

/// Style for layout-driven text: size 30 on white unless a layout says otherwise
pub fn text_style(font: &str, align: Align, color: Color) -> TextStyle {
    TextStyle {
        font: resolve_font(font),
        align,
        color,
        size: 30,
        bg: color::WHITE,
    }
}
