use super::deliver::{deliver, new_surface, text_style, Output};
use super::{lenient, ContentMode, ContentServices, RenderContext, Renderer};
use crate::render::{color, Align};
use anyhow::{Context, Result};
use async_trait::async_trait;
use qrcode::{EcLevel, QrCode};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QrSettings {
    #[serde(rename = "qr-content", deserialize_with = "lenient::string")]
    content: String,
    #[serde(deserialize_with = "lenient::string")]
    title: String,
}

/// QR code under a title, scaled to the space below its anchor
pub struct QrRenderer;

#[async_trait]
impl Renderer for QrRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::QrCode
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: QrSettings = ctx.settings()?;
        let code = QrCode::with_error_correction_level(settings.content.as_bytes(), EcLevel::M)
            .context("Content does not fit in a QR code")?;

        let layout = ctx.layout(services, ContentMode::QrCode);
        let mut surface = new_surface(ctx, services)?;
        surface.draw_text(
            &settings.title,
            layout.int("title", 0),
            layout.int("title", 1),
            &text_style(&layout.text("title", 2), Align::Left, color::BLACK),
        );

        let size = code.width() as i32;
        let top = layout.int("pos", 1);
        let dot = ((ctx.params.height as i32 - top) / size).max(1);
        let left = layout.int("pos", 0) - dot * size / 2;
        for y in 0..size {
            for x in 0..size {
                if code[(x as usize, y as usize)] == qrcode::Color::Dark {
                    surface.fill_rect(left + x * dot, top + y * dot, dot, dot, color::BLACK);
                }
            }
        }

        ctx.schedule_in(12 * 3600);
        deliver(ctx, services, Output::Surface(surface), 0)
    }
}
