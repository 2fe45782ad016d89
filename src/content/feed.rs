// RSS/Atom headlines and calendar agenda

use super::deliver::{deliver, new_surface, text_style, Output};
use super::lenient::{self, to_int, to_text};
use super::{checkin_minutes, interval_minutes, ContentMode, ContentServices, RenderContext};
use super::{Layout, Renderer};
use crate::render::{color, Align, Surface, TextStyle};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use serde::Deserialize;
use std::time::Duration;

/// Headlines longer than this are cut
pub const MAX_HEADLINE: usize = 128;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeedSettings {
    #[serde(deserialize_with = "lenient::string")]
    url: String,
    #[serde(deserialize_with = "lenient::string")]
    title: String,
    #[serde(deserialize_with = "lenient::int")]
    interval: i64,
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn title_of(item: &str) -> Option<String> {
    let open = item.find("<title")?;
    let body_start = open + item[open..].find('>')? + 1;
    let body_len = item[body_start..].find("</title>")?;
    let raw = item[body_start..body_start + body_len].trim();

    let text = match raw
        .strip_prefix("<![CDATA[")
        .and_then(|r| r.strip_suffix("]]>"))
    {
        Some(cdata) => cdata.to_string(),
        None => unescape(raw),
    };
    Some(text.trim().chars().take(MAX_HEADLINE).collect())
}

/// Titles of the first `limit` `<item>` or `<entry>` elements of a feed
pub fn extract_titles(feed: &str, limit: usize) -> Vec<String> {
    let mut titles = Vec::new();
    let mut rest = feed;
    while titles.len() < limit {
        let start = match (rest.find("<item"), rest.find("<entry")) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => break,
        };
        let item = &rest[start + 1..];
        let end = item
            .find("</item>")
            .or_else(|| item.find("</entry>"))
            .unwrap_or(item.len());
        if let Some(title) = title_of(&item[..end]) {
            titles.push(title);
        }
        rest = &item[end..];
    }
    titles
}

fn draw_heading(surface: &mut dyn Surface, layout: &Layout, title: &str) {
    surface.draw_text(
        title,
        layout.int("title", 0),
        layout.int("title", 1),
        &text_style(&layout.text("title", 2), Align::Left, color::BLACK),
    );
}

/// Headlines of an RSS or Atom feed
pub struct RssRenderer;

#[async_trait]
impl Renderer for RssRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::RssFeed
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: FeedSettings = ctx.settings()?;
        let feed = services
            .fetcher
            .get_text(&settings.url)
            .await
            .with_context(|| format!("Failed to fetch feed {}", settings.url))?;

        let layout = ctx.layout(services, ContentMode::RssFeed);
        let items = to_int(layout.get("items")).max(0) as usize;
        let headlines = extract_titles(&feed, items);

        let mut surface = new_surface(ctx, services)?;
        let title = if settings.title.is_empty() {
            "RSS feed"
        } else {
            settings.title.as_str()
        };
        draw_heading(surface.as_mut(), &layout, title);

        let style = text_style(&to_text(layout.get("font")), Align::Left, color::BLACK);
        for (i, headline) in headlines.iter().enumerate() {
            let y = layout.int("line", 1) + i as i32 * layout.int("line", 2);
            surface.draw_text(headline, layout.int("line", 0), y, &style);
        }

        ctx.schedule_in(60 * interval_minutes(settings.interval, 60));
        deliver(ctx, services, Output::Surface(surface), checkin_minutes(settings.interval))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CalendarSettings {
    #[serde(deserialize_with = "lenient::string")]
    apps_script_url: String,
    #[serde(deserialize_with = "lenient::string")]
    title: String,
    #[serde(deserialize_with = "lenient::int")]
    interval: i64,
}

/// Start time label: clock time for events later today, otherwise the date.
pub fn event_label(start: i64, now: &DateTime<FixedOffset>) -> String {
    let Some(utc) = DateTime::from_timestamp(start, 0) else {
        return String::new();
    };
    let local = utc.with_timezone(now.offset());
    let before_today = local.date_naive() < now.date_naive();
    let all_day = local.hour() == 0 && local.minute() == 0;
    let far = start - now.timestamp() >= 86400;
    if before_today || all_day || far {
        format!("{:02}-{:02}", local.day(), local.month())
    } else {
        format!("{:02}:{:02}", local.hour(), local.minute())
    }
}

/// Agenda from a JSON event list `[{title, start, end}]`
pub struct CalendarRenderer;

#[async_trait]
impl Renderer for CalendarRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::Calendar
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: CalendarSettings = ctx.settings()?;
        let timeout = Duration::from_secs(services.config.calendar_timeout_seconds);
        let doc = services
            .fetcher
            .get_json_within(&settings.apps_script_url, timeout)
            .await
            .context("Failed to fetch calendar")?;
        let Some(events) = doc.as_array() else {
            bail!("Calendar response is not an event list");
        };

        let now = ctx.now;
        let layout = ctx.layout(services, ContentMode::Calendar);
        let mut surface = new_surface(ctx, services)?;

        let title = if settings.title.is_empty() {
            "Calendar"
        } else {
            settings.title.as_str()
        };
        draw_heading(surface.as_mut(), &layout, title);
        surface.draw_text(
            &now.format("%d.%m.%Y").to_string(),
            layout.int("date", 0),
            layout.int("date", 1),
            &text_style(&layout.text("title", 2), Align::Right, color::BLACK),
        );

        let items = to_int(layout.get("items")).max(0) as usize;
        let font = layout.text("line", 3);
        let step = layout.int("line", 2);
        for (i, event) in events.iter().take(items).enumerate() {
            let y = layout.int("line", 1) + i as i32 * step;
            let start = to_int(&event["start"]);
            let end = to_int(&event["end"]);

            let current = start <= now.timestamp() && end > now.timestamp();
            let style = if current {
                surface.fill_rect(
                    layout.int("red", 0),
                    layout.int("red", 1) + i as i32 * step,
                    layout.int("red", 2),
                    layout.int("red", 3),
                    color::RED,
                );
                TextStyle {
                    bg: color::RED,
                    ..text_style(&font, Align::Left, color::WHITE)
                }
            } else {
                text_style(&font, Align::Left, color::BLACK)
            };

            if start > 0 {
                surface.draw_text(&event_label(start, &now), layout.int("line", 0), y, &style);
            }
            surface.draw_text(&to_text(&event["title"]), layout.int("line", 4), y, &style);
        }

        ctx.schedule_in(60 * interval_minutes(settings.interval, 15));
        deliver(ctx, services, Output::Surface(surface), checkin_minutes(settings.interval))
    }
}
