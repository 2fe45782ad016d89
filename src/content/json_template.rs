use super::deliver::{deliver, new_surface, Output};
use super::{checkin_minutes, interval_minutes, lenient};
use super::{ContentMode, ContentServices, RenderContext, Renderer};
use crate::http::Conditional;
use crate::render::{draw_element, Surface};
use crate::storage::normalize_path;
use crate::template::{decode_elements, TemplateStream};
use crate::vars::VariableStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::io::{BufRead, BufReader};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TemplateSettings {
    #[serde(deserialize_with = "lenient::string")]
    filename: String,
    #[serde(deserialize_with = "lenient::string")]
    url: String,
    #[serde(deserialize_with = "lenient::int")]
    interval: i64,
    #[serde(rename = "#fetched", deserialize_with = "lenient::int")]
    fetched: i64,
}

fn draw_stream<R: BufRead>(surface: &mut dyn Surface, vars: &VariableStore, reader: R) -> Result<()> {
    let drawn = decode_elements(reader, |element| draw_element(&mut *surface, vars, &element))
        .context("Failed to read draw elements")?;
    debug!(elements = drawn, "Drew template");
    Ok(())
}

/// Draw-element list from a template file or URL.
///
/// A template file combined with a URL has its `{.path}` tokens filled in
/// from the JSON document at the URL.
pub struct JsonTemplateRenderer;

impl JsonTemplateRenderer {
    fn draw_file(
        ctx: &mut RenderContext,
        services: &ContentServices,
        filename: &str,
        doc: Option<&Value>,
    ) -> Result<Box<dyn Surface>> {
        let path = normalize_path(filename);
        let template = services
            .store
            .read(&path)
            .with_context(|| format!("Error opening template {}", path))?;

        let mut surface = new_surface(ctx, services)?;
        match doc {
            Some(doc) => {
                let stream = TemplateStream::new(template.as_slice(), doc);
                draw_stream(surface.as_mut(), &services.vars, BufReader::new(stream))?
            }
            None => draw_stream(surface.as_mut(), &services.vars, template.as_slice())?,
        }
        Ok(surface)
    }
}

#[async_trait]
impl Renderer for JsonTemplateRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::JsonTemplate
    }

    fn failure_backoff(&self) -> i64 {
        600
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: TemplateSettings = ctx.settings()?;
        let checkin = checkin_minutes(settings.interval);

        if !settings.filename.is_empty() {
            if settings.url.is_empty() {
                ctx.schedule_never();
                let surface = Self::draw_file(ctx, services, &settings.filename, None)?;
                return deliver(ctx, services, Output::Surface(surface), checkin);
            }

            let doc = services
                .fetcher
                .get_json(&settings.url)
                .await
                .with_context(|| format!("Failed to fetch template data {}", settings.url))?;
            ctx.schedule_in(60 * interval_minutes(settings.interval, 3));
            let surface = Self::draw_file(ctx, services, &settings.filename, Some(&doc))?;
            return deliver(ctx, services, Output::Surface(surface), checkin);
        }

        let fetched = services
            .fetcher
            .get_conditional(&settings.url, settings.fetched, &ctx.tag.mac)
            .await
            .with_context(|| format!("Failed to fetch template {}", settings.url))?;
        ctx.schedule_in(60 * interval_minutes(settings.interval, 15));

        if let Conditional::Fetched(body) = fetched {
            let mut surface = new_surface(ctx, services)?;
            draw_stream(surface.as_mut(), &services.vars, body.as_slice())?;
            deliver(ctx, services, Output::Surface(surface), checkin)?;
            let now = ctx.timestamp();
            ctx.persist("#fetched", now);
        }
        Ok(())
    }
}
