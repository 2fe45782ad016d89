use super::deliver::{deliver, new_surface, text_style, Output};
use super::{checkin_minutes, ContentMode, ContentServices, RenderContext, Renderer};
use crate::clock::next_midnight;
use crate::render::{color, Align};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Datelike;

/// Today's date, refreshed at local midnight
pub struct DateRenderer;

#[async_trait]
impl Renderer for DateRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::Today
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let language = services.language();
        let now = ctx.now;
        let day = language.day_name(now.weekday());
        let midnight = next_midnight(&now);
        let checkin = checkin_minutes((midnight - ctx.timestamp()) / 60 - 10);

        let output = if ctx.is_segment() {
            let text = format!(
                "{:2}{:2}{:<2.2}{:04}",
                now.day(),
                now.month(),
                day,
                now.year()
            );
            ctx.params.set_segments(&text, 0x04);
            Output::Segments
        } else {
            let layout = ctx.layout(services, ContentMode::Today);
            let mut surface = new_surface(ctx, services)?;
            let style = |key: &str, color| text_style(&layout.text(key, 2), Align::Center, color);

            let weekday = (layout.int("weekday", 0), layout.int("weekday", 1));
            if layout.has("date") {
                surface.draw_text(
                    day,
                    weekday.0,
                    weekday.1,
                    &style("weekday", color::RED),
                );
                let date = format!("{} {}", now.day(), language.month_name(now.month0()));
                surface.draw_text(
                    &date,
                    layout.int("date", 0),
                    layout.int("date", 1),
                    &style("date", color::BLACK),
                );
            } else {
                surface.draw_text(
                    day,
                    weekday.0,
                    weekday.1,
                    &style("weekday", color::BLACK),
                );
                surface.draw_text(
                    language.month_name(now.month0()),
                    layout.int("month", 0),
                    layout.int("month", 1),
                    &style("month", color::BLACK),
                );
                surface.draw_text(
                    &now.day().to_string(),
                    layout.int("day", 0),
                    layout.int("day", 1),
                    &style("day", color::RED),
                );
            }
            Output::Surface(surface)
        };

        ctx.schedule_at(midnight);
        deliver(ctx, services, output, checkin)
    }
}
