// One-shot pushes: firmware, commands, settings, NFC and LUT payloads.
// These modes send once and park the tag at the far-future sentinel.

use super::deliver::{deliver, Output};
use super::{checkin_minutes, lenient, ContentMode, ContentServices, RenderContext, Renderer};
use crate::storage::normalize_path;
use crate::transport::{data_type, nfc_url_record, parse_lut, TagSettings};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

fn push(ctx: &RenderContext, services: &ContentServices, kind: u8, payload: &[u8], checkin: u16) {
    if !services
        .transport
        .send_image(&ctx.tag.mac, kind, payload, checkin)
    {
        warn!(mac = %ctx.tag.mac, data_type = kind, "Transport refused payload");
    }
}

/// Hand the tag back to the plain image mode with nothing queued
fn finish_one_shot(ctx: &mut RenderContext) {
    ctx.persist("filename", "");
    ctx.schedule_never();
    ctx.tag.content_mode = ContentMode::Image.id();
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FirmwareSettings {
    #[serde(deserialize_with = "lenient::string")]
    filename: String,
    #[serde(rename = "#fetched", deserialize_with = "lenient::boolean")]
    fetched: bool,
    #[serde(deserialize_with = "lenient::int")]
    timetolive: i64,
}

pub struct FirmwareRenderer;

#[async_trait]
impl Renderer for FirmwareRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::Firmware
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: FirmwareSettings = ctx.settings()?;
        if settings.filename.is_empty() || settings.fetched {
            ctx.schedule_in(300);
            return Ok(());
        }

        let path = normalize_path(&settings.filename);
        match services.store.read(&path) {
            Ok(image) => {
                info!(mac = %ctx.tag.mac, file = %path, "Pushing firmware");
                push(
                    ctx,
                    services,
                    data_type::FW_UPDATE,
                    &image,
                    checkin_minutes(settings.timetolive),
                );
                ctx.persist("#fetched", true);
            }
            Err(e) => warn!(mac = %ctx.tag.mac, error = %e, "Error accessing firmware"),
        }
        finish_one_shot(ctx);
        Ok(())
    }
}

pub struct RemoteApRenderer;

#[async_trait]
impl Renderer for RemoteApRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::RemoteAp
    }

    async fn render(&self, ctx: &mut RenderContext, _services: &ContentServices) -> Result<()> {
        ctx.schedule_never();
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegStaticSettings {
    #[serde(deserialize_with = "lenient::string")]
    line1: String,
    #[serde(deserialize_with = "lenient::string")]
    line2: String,
    #[serde(deserialize_with = "lenient::string")]
    line3: String,
}

/// Fixed text on a segment display
pub struct SegStaticRenderer;

#[async_trait]
impl Renderer for SegStaticRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::SegStatic
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let s: SegStaticSettings = ctx.settings()?;
        let text = format!("{:<4.4}{:<2.2}{:<4.4}", s.line1, s.line2, s.line3);
        ctx.params.set_segments(&text, 0);
        ctx.params.invert = false;
        ctx.schedule_never();
        deliver(ctx, services, Output::Segments, 0)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NfcSettings {
    #[serde(deserialize_with = "lenient::string")]
    url: String,
}

pub struct NfcUrlRenderer;

#[async_trait]
impl Renderer for NfcUrlRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::NfcUrl
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: NfcSettings = ctx.settings()?;
        ctx.schedule_never();
        push(
            ctx,
            services,
            data_type::NFC_RAW_CONTENT,
            &nfc_url_record(&settings.url),
            0,
        );
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LutSettings {
    #[serde(deserialize_with = "lenient::string")]
    bytes: String,
}

/// Custom waveform lookup table
pub struct GrayLutRenderer;

#[async_trait]
impl Renderer for GrayLutRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::GrayLut
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: LutSettings = ctx.settings()?;
        ctx.schedule_never();
        push(
            ctx,
            services,
            data_type::CUSTOM_LUT_OTA,
            &parse_lut(&settings.bytes),
            0,
        );
        ctx.tag.has_custom_lut = true;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommandSettings {
    #[serde(deserialize_with = "lenient::int")]
    cmd: i64,
}

pub struct TagCommandRenderer;

#[async_trait]
impl Renderer for TagCommandRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::TagCommand
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: CommandSettings = ctx.settings()?;
        let sent = services.transport.send_raw_command(
            &ctx.tag.mac,
            settings.cmd as u8,
            &[],
            !ctx.tag.is_external,
        );
        if !sent {
            warn!(mac = %ctx.tag.mac, cmd = settings.cmd, "Transport refused command");
        }
        finish_one_shot(ctx);
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TagConfigSettings {
    #[serde(deserialize_with = "lenient::int")]
    fastboot: i64,
    #[serde(deserialize_with = "lenient::int")]
    rfwake: i64,
    #[serde(deserialize_with = "lenient::int")]
    tagroaming: i64,
    #[serde(deserialize_with = "lenient::int")]
    tagscanontimeout: i64,
    #[serde(deserialize_with = "lenient::int")]
    showlowbat: i64,
    #[serde(deserialize_with = "lenient::int")]
    shownorf: i64,
    #[serde(deserialize_with = "lenient::int")]
    fixedchannel: i64,
    #[serde(deserialize_with = "lenient::int")]
    lowvoltage: i64,
}

impl From<TagConfigSettings> for TagSettings {
    fn from(s: TagConfigSettings) -> Self {
        TagSettings {
            fast_boot: s.fastboot as u8,
            rf_wake: s.rfwake as u8,
            tag_roaming: s.tagroaming as u8,
            scan_for_ap_after_timeout: s.tagscanontimeout as u8,
            low_bat_symbol: s.showlowbat as u8,
            no_rf_symbol: s.shownorf as u8,
            fixed_channel: s.fixedchannel as u8,
            bat_low_voltage: s.lowvoltage as u16,
        }
    }
}

/// Tag behaviour settings
pub struct TagConfigRenderer;

#[async_trait]
impl Renderer for TagConfigRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::TagConfig
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let settings: TagConfigSettings = ctx.settings()?;
        let payload = TagSettings::from(settings).to_bytes();
        push(ctx, services, data_type::TAG_CONFIG, &payload, 0);
        finish_one_shot(ctx);
        Ok(())
    }
}

/// Mirrors another tag; nothing to render here
pub struct DisplayCopyRenderer;

#[async_trait]
impl Renderer for DisplayCopyRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::DisplayCopy
    }

    async fn render(&self, ctx: &mut RenderContext, _services: &ContentServices) -> Result<()> {
        ctx.schedule_never();
        Ok(())
    }
}
