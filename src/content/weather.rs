// Current conditions and multi-day forecast from open-meteo

use super::deliver::{deliver, new_surface, text_style, Output};
use super::lenient::{self, to_float, to_int, to_text};
use super::{ContentMode, ContentServices, RenderContext, Renderer};
use crate::render::{color, Align, Color};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

const ICON_FONT: &str = "/fonts/weathericons.ttf";

const WEATHER_ICONS: [&str; 60] = [
    "\u{f00d}", "\u{f00c}", "\u{f002}", "\u{f013}", "\u{f013}", "\u{f014}", "", "", "\u{f014}", "", "",
    "\u{f01a}", "", "\u{f01a}", "", "\u{f01a}", "\u{f017}", "\u{f017}", "", "", "",
    "\u{f019}", "", "\u{f019}", "", "\u{f019}", "\u{f015}", "\u{f015}", "", "", "",
    "\u{f01b}", "", "\u{f01b}", "", "\u{f01b}", "", "\u{f076}", "", "", "\u{f01a}",
    "\u{f01a}", "\u{f01a}", "", "", "\u{f064}", "\u{f064}", "", "", "", "",
    "", "", "", "", "\u{f01e}", "\u{f01d}", "", "", "\u{f01e}",
];

const NIGHT_ICONS: [&str; 3] = ["\u{f02e}", "\u{f083}", "\u{f086}"];

const WIND_DIRECTIONS: [&str; 8] = [
    "\u{f044}", "\u{f043}", "\u{f048}", "\u{f087}", "\u{f058}", "\u{f057}", "\u{f04d}", "\u{f088}",
];

const UMBRELLA: &str = "\u{f084}";

const WEATHER_TEXT: [&str; 60] = [
    "sun", "sun", "sun", "CLDY", "CLDY", "FOG", "", "", "FOG", "", "",
    "DRZL", "", "DRZL", "", "DRZL", "ice", "ice", "", "", "",
    "rain", "", "rain", "", "rain", "ice", "ice", "", "", "",
    "SNOW", "", "SNOW", "", "SNOW", "", "SNOW", "", "", "rain",
    "rain", "rain", "", "", "SNOW", "SNOW", "", "", "", "",
    "", "", "", "", "STRM", "HAIL", "", "", "HAIL",
];

const BEAUFORT_SPEEDS: [f64; 12] = [
    0.3, 1.5, 3.3, 5.5, 8.0, 10.8, 13.9, 17.2, 20.8, 24.5, 28.5, 32.7,
];

/// Beaufort number for a wind speed in m/s
pub fn wind_speed_to_beaufort(speed: f64) -> u8 {
    BEAUFORT_SPEEDS.iter().filter(|s| speed >= **s).count() as u8
}

/// Weather codes above 40 repeat the lower range
fn normalize_code(code: i64) -> usize {
    let code = if code > 40 { code - 40 } else { code };
    code.clamp(0, WEATHER_ICONS.len() as i64 - 1) as usize
}

fn weather_icon(code: usize, night: bool) -> &'static str {
    if night && code < NIGHT_ICONS.len() {
        NIGHT_ICONS[code]
    } else {
        WEATHER_ICONS[code]
    }
}

fn wind_direction_icon(degrees: i64) -> &'static str {
    let index = ((degrees + 22) / 45).clamp(0, 8) as usize;
    WIND_DIRECTIONS[index % 8]
}

fn icon_color(code: usize) -> Color {
    match code {
        55 | 65 | 75 | 82 | 86 | 95 | 96 | 99 => color::RED,
        _ => color::BLACK,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WeatherSettings {
    #[serde(deserialize_with = "lenient::string")]
    location: String,
    #[serde(deserialize_with = "lenient::string")]
    units: String,
}

impl WeatherSettings {
    fn imperial(&self) -> bool {
        self.units == "1"
    }

    fn unit_query(&self) -> &'static str {
        if self.imperial() {
            "&temperature_unit=fahrenheit&windspeed_unit=mph"
        } else {
            ""
        }
    }
}

/// Resolved coordinates of a configured location
pub(super) struct Location {
    pub lat: String,
    pub lon: String,
    pub tz: String,
}

/// Geocode `location` once and keep the result in `#lat`, `#lon` and `#tz`
pub(super) async fn ensure_location(
    ctx: &mut RenderContext,
    services: &ContentServices,
) -> Result<Location> {
    let cached = |key: &str| to_text(ctx.config.get(key).unwrap_or(&Value::Null));
    let (lat, lon) = (cached("#lat"), cached("#lon"));
    if !lat.is_empty() && !lon.is_empty() {
        return Ok(Location {
            lat,
            lon,
            tz: cached("#tz"),
        });
    }

    let location = to_text(ctx.config.get("location").unwrap_or(&Value::Null));
    info!(mac = %ctx.tag.mac, location = %location, "Resolving location");
    let url = format!(
        "{}?name={}&count=1",
        services.config.geocoding_url,
        urlencoding::encode(&location)
    );
    let doc = services
        .fetcher
        .get_json(&url)
        .await
        .context("Geocoding request failed")?;
    let result = &doc["results"][0];
    if result.is_null() {
        bail!("Location '{}' not found", location);
    }

    let resolved = Location {
        lat: to_text(&result["latitude"]),
        lon: to_text(&result["longitude"]),
        tz: to_text(&result["timezone"]),
    };
    ctx.persist("#lat", resolved.lat.clone());
    ctx.persist("#lon", resolved.lon.clone());
    ctx.persist("#tz", resolved.tz.clone());
    Ok(resolved)
}

/// Current weather conditions
pub struct WeatherRenderer;

#[async_trait]
impl Renderer for WeatherRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::Weather
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: WeatherSettings = ctx.settings()?;
        let location = ensure_location(ctx, services).await?;

        let url = format!(
            "{}?latitude={}&longitude={}&current_weather=true&windspeed_unit=ms&timezone={}{}",
            services.config.forecast_url,
            location.lat,
            location.lon,
            urlencoding::encode(&location.tz),
            settings.unit_query()
        );
        let doc = services
            .fetcher
            .get_json(&url)
            .await
            .context("Weather request failed")?;

        let current = &doc["current_weather"];
        let temperature = to_float(&current["temperature"]);
        let wind_speed = to_float(&current["windspeed"]);
        let wind_direction = to_int(&current["winddirection"]);
        let night = to_int(&current["is_day"]) == 0;
        let code = normalize_code(to_int(&current["weathercode"]));

        let beaufort = wind_speed_to_beaufort(wind_speed);
        let wind = if settings.imperial() {
            wind_speed as i64
        } else {
            beaufort as i64
        };

        let output = if ctx.is_segment() {
            let (shown, symbols) = if temperature < -9.9 {
                (temperature as i64, 0x00)
            } else {
                ((temperature * 10.0) as i64, 0x04)
            };
            let text = format!("{:3}^{:2}{:<4.4}", shown, wind, WEATHER_TEXT[code]);
            ctx.params.set_segments(&text, symbols);
            Output::Segments
        } else {
            let layout = ctx.layout(services, ContentMode::Weather);
            let mut surface = new_surface(ctx, services)?;

            surface.draw_text(
                &settings.location,
                layout.int("location", 0),
                layout.int("location", 1),
                &text_style(&layout.text("location", 2), Align::Left, color::BLACK),
            );
            let wind_color = if beaufort > 4 { color::RED } else { color::BLACK };
            surface.draw_text(
                &wind.to_string(),
                layout.int("wind", 0),
                layout.int("wind", 1),
                &text_style(&layout.text("wind", 2), Align::Right, wind_color),
            );
            let temp_color = if temperature < 0.0 { color::RED } else { color::BLACK };
            surface.draw_text(
                &format!("{:.1}", temperature),
                layout.int("temp", 0),
                layout.int("temp", 1),
                &text_style(&layout.text("temp", 2), Align::Left, temp_color),
            );

            let mut icon = text_style(
                ICON_FONT,
                Align::from_datum(layout.int("icon", 3)),
                icon_color(code),
            );
            icon.size = layout.int_or("icon", 2, 30) as u16;
            surface.draw_text(
                weather_icon(code, night),
                layout.int("icon", 0),
                layout.int("icon", 1),
                &icon,
            );

            let mut dir = text_style(ICON_FONT, Align::Center, color::BLACK);
            dir.size = layout.int_or("dir", 2, 30) as u16;
            surface.draw_text(
                wind_direction_icon(wind_direction),
                layout.int("dir", 0),
                layout.int("dir", 1),
                &dir,
            );

            if code > 10 {
                let mut umbrella = text_style(ICON_FONT, Align::Center, color::RED);
                umbrella.size = layout.int_or("umbrella", 2, 30) as u16;
                surface.draw_text(
                    UMBRELLA,
                    layout.int("umbrella", 0),
                    layout.int("umbrella", 1),
                    &umbrella,
                );
            }
            Output::Surface(surface)
        };

        ctx.schedule_in(1800);
        deliver(ctx, services, output, 15)
    }
}

/// Multi-day forecast in columns
pub struct ForecastRenderer;

#[async_trait]
impl Renderer for ForecastRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::Forecast
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        if ctx.is_segment() {
            bail!("Forecast cannot be shown on a segment display");
        }
        let settings: WeatherSettings = ctx.settings()?;
        let location = ensure_location(ctx, services).await?;

        let url = format!(
            "{}?latitude={}&longitude={}&daily=weathercode,temperature_2m_max,temperature_2m_min,precipitation_sum,windspeed_10m_max,winddirection_10m_dominant&windspeed_unit=ms&timeformat=unixtime&timezone={}{}",
            services.config.forecast_url,
            location.lat,
            location.lon,
            urlencoding::encode(&location.tz),
            settings.unit_query()
        );
        let doc = services
            .fetcher
            .get_json(&url)
            .await
            .context("Forecast request failed")?;
        let daily = &doc["daily"];

        let language = services.language();
        let offset = *ctx.now.offset();
        let layout = ctx.layout(services, ContentMode::Forecast);
        let mut surface = new_surface(ctx, services)?;

        surface.draw_text(
            &settings.location,
            layout.int("location", 0),
            layout.int("location", 1),
            &text_style(&layout.text("location", 2), Align::Left, color::BLACK),
        );

        let columns = layout.int("column", 0).max(0);
        let width = layout.int("column", 1);
        let day_font = layout.text("day", 2);
        let icon_size = layout.int_or("icon", 2, 30) as u16;

        for col in 0..columns {
            let i = col as usize;
            let x = col * width;
            let day_x = x + layout.int("day", 0);

            let stamp = to_int(&daily["time"][i]);
            if let Some(date) = DateTime::from_timestamp(stamp, 0) {
                let weekday = date.with_timezone(&offset).weekday();
                surface.draw_text(
                    language.day_short(weekday),
                    day_x,
                    layout.int("day", 1),
                    &text_style(&day_font, Align::Center, color::BLACK),
                );
            }

            let code = normalize_code(to_int(&daily["weathercode"][i]));
            let mut icon = text_style(ICON_FONT, Align::Center, icon_color(code));
            icon.size = icon_size;
            surface.draw_text(
                weather_icon(code, false),
                x + layout.int("icon", 0),
                layout.int("icon", 1),
                &icon,
            );

            let mut dir = text_style(ICON_FONT, Align::Center, color::BLACK);
            dir.size = icon_size;
            surface.draw_text(
                wind_direction_icon(to_int(&daily["winddirection_10m_dominant"][i])),
                x + layout.int("wind", 0),
                layout.int("wind", 1),
                &dir,
            );

            let tmin = to_float(&daily["temperature_2m_min"][i]).round() as i64;
            let tmax = to_float(&daily["temperature_2m_max"][i]).round() as i64;
            let max_speed = to_float(&daily["windspeed_10m_max"][i]);
            let beaufort = wind_speed_to_beaufort(max_speed);
            let wind = if settings.imperial() {
                max_speed as i64
            } else {
                beaufort as i64
            };

            if layout.has("rain") {
                let rain = to_float(&daily["precipitation_sum"][i]).round() as i64;
                if rain > 0 {
                    let ink = if rain > 10 { color::RED } else { color::BLACK };
                    surface.draw_text(
                        &format!("{}mm", rain),
                        x + layout.int("rain", 0),
                        layout.int("rain", 1),
                        &text_style(&day_font, Align::Center, ink),
                    );
                }
            }

            let ink = |t: i64| if t < 0 { color::RED } else { color::BLACK };
            surface.draw_text(
                &format!("{} ", tmin),
                day_x,
                layout.int("day", 4),
                &text_style(&day_font, Align::Right, ink(tmin)),
            );
            surface.draw_text(
                &format!(" {}", tmax),
                day_x,
                layout.int("day", 4),
                &text_style(&day_font, Align::Left, ink(tmax)),
            );
            let wind_color = if beaufort > 5 { color::RED } else { color::BLACK };
            surface.draw_text(
                &wind.to_string(),
                x + width - 10,
                layout.int("day", 3),
                &text_style(&day_font, Align::Right, wind_color),
            );

            if col > 0 {
                let (top, bottom) = (layout.int("line", 0), layout.int("line", 1));
                let mut y = top;
                while y < bottom {
                    surface.fill_rect(x, y, 1, 1, color::BLACK);
                    y += 3;
                }
            }
        }

        ctx.schedule_in(3600);
        deliver(ctx, services, Output::Surface(surface), 15)
    }
}
