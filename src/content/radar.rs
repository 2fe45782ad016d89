// Buienradar precipitation forecast: 24 five-minute samples as bars

use super::deliver::{deliver, new_surface, text_style, Output};
use super::weather::ensure_location;
use super::{lenient, ContentMode, ContentServices, RenderContext, Renderer};
use crate::render::{color, Align};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

const SAMPLES: usize = 24;
const STRIDE: usize = 11;
const DRY: u8 = 70;
const HEAVY: u8 = 130;

/// One line of the radar response: `vvv|hh:mm`
#[derive(Clone, Debug, PartialEq)]
pub struct RadarSample {
    /// Rain intensity, clamped to 70..=180 (70 = dry)
    pub value: u8,
    pub time: String,
}

impl RadarSample {
    fn minutes(&self) -> u32 {
        self.time.get(3..).and_then(|m| m.parse().ok()).unwrap_or(0)
    }
}

pub fn parse_samples(body: &str) -> Vec<RadarSample> {
    (0..SAMPLES)
        .map(|i| {
            let start = i * STRIDE;
            let value: u8 = body
                .get(start..start + 3)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
            RadarSample {
                value: value.clamp(DRY, 180),
                time: body.get(start + 4..start + 9).unwrap_or("").to_string(),
            }
        })
        .collect()
}

/// Minutes until the next radar refresh: soon when rain is near
pub fn rain_refresh(samples: &[RadarSample]) -> i64 {
    let mut refresh = 60;
    for (i, sample) in samples.iter().enumerate() {
        if sample.value > DRY {
            if i < 12 {
                refresh = 5;
            } else if refresh > 5 {
                refresh = 15;
            }
        }
    }
    refresh
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RadarSettings {
    #[serde(deserialize_with = "lenient::string")]
    location: String,
}

pub struct RadarRenderer;

impl RadarRenderer {
    async fn fetch(ctx: &mut RenderContext, services: &ContentServices) -> Result<String> {
        let location = ensure_location(ctx, services).await?;
        let url = format!(
            "{}?lat={}&lon={}",
            services.config.radar_url, location.lat, location.lon
        );
        Ok(services.fetcher.get_text(&url).await?)
    }
}

#[async_trait]
impl Renderer for RadarRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::Buienradar
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: RadarSettings = ctx.settings()?;
        let body = match Self::fetch(ctx, services).await {
            Ok(body) => body,
            Err(e) => {
                warn!(mac = %ctx.tag.mac, error = %e, "Radar fetch failed");
                ctx.schedule_in(3600);
                return Ok(());
            }
        };

        let samples = parse_samples(&body);
        let refresh = rain_refresh(&samples);

        let layout = ctx.layout(services, ContentMode::Buienradar);
        let mut surface = new_surface(ctx, services)?;
        surface.draw_text(
            &settings.location,
            layout.int("location", 0),
            layout.int("location", 1),
            &text_style(&layout.text("location", 2), Align::Left, color::BLACK),
        );
        surface.draw_text(
            "Buienradar",
            layout.int("title", 0),
            layout.int("title", 1),
            &text_style(&layout.text("title", 2), Align::Left, color::BLACK),
        );

        let (bar_x, bar_base, bar_width) = (
            layout.int("bars", 0),
            layout.int("bars", 1),
            layout.int("bars", 2),
        );
        let (label_x, label_y, spacing) = (
            layout.int("cols", 0),
            layout.int("cols", 1),
            layout.int("cols", 2),
        );
        let label_style = text_style(&layout.text("cols", 3), Align::Left, color::BLACK);

        for (i, sample) in samples.iter().enumerate() {
            let i = i as i32;
            let height = (sample.value - DRY) as i32;
            let ink = if sample.value > HEAVY {
                color::RED
            } else {
                color::BLACK
            };
            surface.fill_rect(i * spacing + bar_x, bar_base - height, bar_width, height, ink);
            if !sample.time.is_empty() && sample.minutes() % 15 == 0 {
                surface.draw_text(&sample.time, i * spacing + label_x, label_y, &label_style);
            }
        }

        ctx.schedule_in(refresh * 60);
        deliver(ctx, services, Output::Surface(surface), refresh as u16)
    }
}
