use super::deliver::{deliver, Output};
use super::{checkin_minutes, interval_minutes, lenient};
use super::{ContentMode, ContentServices, RenderContext, Renderer};
use crate::http::Conditional;
use crate::storage::normalize_path;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageSettings {
    #[serde(deserialize_with = "lenient::string")]
    filename: String,
    #[serde(deserialize_with = "lenient::string")]
    dither: String,
    #[serde(deserialize_with = "lenient::string")]
    delete: String,
    #[serde(deserialize_with = "lenient::int")]
    timetolive: i64,
}

/// Uploaded image file, decoded and dithered for the panel
pub struct ImageRenderer;

#[async_trait]
impl Renderer for ImageRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::Image
    }

    fn failure_backoff(&self) -> i64 {
        600
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        ctx.schedule_never();
        let settings: ImageSettings = ctx.settings()?;
        if settings.filename.is_empty() {
            return Ok(());
        }
        let source = normalize_path(&settings.filename);
        let checkin = checkin_minutes(settings.timetolive);

        if !services.store.exists(&source) {
            let current = ctx.current_image_path();
            if !services.store.exists(&current) {
                bail!("File {} not found", source);
            }
            let buffer = services.store.read(&current)?;
            info!(mac = %ctx.tag.mac, file = %source, "File not found, resending current image");
            if !services
                .transport
                .send_image(&ctx.tag.mac, ctx.params.data_type, &buffer, checkin)
            {
                warn!(mac = %ctx.tag.mac, "Transport refused image data");
            }
            return Ok(());
        }

        ctx.params.dither = settings.dither == "1";
        let data = services.store.read(&source)?;
        let buffer = services
            .codec
            .decode_and_dither(&data, &mut ctx.params)
            .with_context(|| format!("Failed to decode {}", source))?;
        deliver(ctx, services, Output::Buffer(buffer), checkin)?;

        if settings.delete == "1" {
            if let Err(e) = services.store.remove(&source) {
                warn!(file = %source, error = %e, "Failed to delete image after sending");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageUrlSettings {
    #[serde(deserialize_with = "lenient::string")]
    url: String,
    #[serde(deserialize_with = "lenient::int")]
    interval: i64,
    #[serde(rename = "#fetched", deserialize_with = "lenient::int")]
    fetched: i64,
}

/// Image fetched from a URL, refreshed only when the server reports a change
pub struct ImageUrlRenderer;

#[async_trait]
impl Renderer for ImageUrlRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::ImageUrl
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: ImageUrlSettings = ctx.settings()?;
        let interval = interval_minutes(settings.interval, 15);

        let fetched = services
            .fetcher
            .get_conditional(&settings.url, settings.fetched, &ctx.tag.mac)
            .await
            .with_context(|| format!("Failed to fetch {}", settings.url))?;

        ctx.schedule_in(60 * interval);
        match fetched {
            Conditional::Fetched(data) => {
                let buffer = services
                    .codec
                    .decode_and_dither(&data, &mut ctx.params)
                    .with_context(|| format!("Failed to decode image from {}", settings.url))?;
                deliver(ctx, services, Output::Buffer(buffer), checkin_minutes(settings.interval))?;
                let now = ctx.timestamp();
                ctx.persist("#fetched", now);
            }
            Conditional::NotModified => {}
        }
        Ok(())
    }
}
