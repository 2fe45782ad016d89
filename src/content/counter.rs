use super::deliver::{deliver, new_surface, text_style, Output};
use super::{lenient, ContentMode, ContentServices, RenderContext, Renderer};
use crate::clock::next_midnight;
use crate::render::{color, Align};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CounterSettings {
    #[serde(deserialize_with = "lenient::int")]
    counter: i64,
    #[serde(deserialize_with = "lenient::int")]
    thresholdred: i64,
}

/// Counts days or hours; the tag's button resets the count
pub struct CounterRenderer {
    mode: ContentMode,
}

impl CounterRenderer {
    pub fn days() -> Self {
        Self {
            mode: ContentMode::CountDays,
        }
    }

    pub fn hours() -> Self {
        Self {
            mode: ContentMode::CountHours,
        }
    }

    fn is_hours(&self) -> bool {
        self.mode == ContentMode::CountHours
    }
}

/// Segment text and symbols for a count
pub fn counter_segments(count: i64, hours: bool) -> (String, u16) {
    let count = count.abs();
    if count > 19999 {
        return ("over  flow".to_string(), 0);
    }
    let (digits, symbols) = if count > 9999 {
        (format!("{:04}", count - 10000), 0x02)
    } else {
        (format!("{:4}", count), 0)
    };
    let unit = if hours { "  hour" } else { "  days" };
    (format!("{}{}", digits, unit), symbols)
}

#[async_trait]
impl Renderer for CounterRenderer {
    fn mode(&self) -> ContentMode {
        self.mode
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: CounterSettings = ctx.settings()?;
        let count = if ctx.button_pressed { 0 } else { settings.counter };

        let output = if ctx.is_segment() {
            let (text, symbols) = counter_segments(count, self.is_hours());
            ctx.params.set_segments(&text, symbols);
            Output::Segments
        } else {
            let layout = ctx.layout(services, ContentMode::CountDays);
            let magnitude = count.abs();
            let font_index = match magnitude {
                0..=99 => 0,
                100..=999 => 1,
                1000..=9999 => 2,
                _ => 3,
            };
            let ink = if count > settings.thresholdred {
                color::RED
            } else {
                color::BLACK
            };
            let style = text_style(&layout.text("fonts", font_index), Align::Center, ink);
            let mut surface = new_surface(ctx, services)?;
            surface.draw_text(
                &magnitude.to_string(),
                layout.int("xy", 0),
                layout.int("xy", 1),
                &style,
            );
            Output::Surface(surface)
        };

        let (next_update, checkin) = if self.is_hours() {
            (ctx.timestamp() + 3600, 5)
        } else {
            (next_midnight(&ctx.now), 15)
        };
        ctx.schedule_at(next_update);
        let checkin = if ctx.button_pressed { 0 } else { checkin };
        deliver(ctx, services, output, checkin)?;
        ctx.persist("counter", count + 1);
        Ok(())
    }
}
