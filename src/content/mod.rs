//! Content modes and their renderers.
//!
//! Every content mode is served by one [`Renderer`]. A renderer reads its
//! typed settings from the tag's mode config, produces content for the tag
//! (an image buffer, segment text or a one-shot payload) and decides the
//! tag's next update time. Errors are returned to the dispatcher, which
//! applies the renderer's [`Renderer::failure_backoff`].

mod ap_info;
mod counter;
mod date;
mod deliver;
mod feed;
mod image;
mod json_template;
mod layout;
mod lenient;
mod push;
mod qr;
mod radar;
mod weather;

pub use ap_info::ApInfoRenderer;
pub use counter::{counter_segments, CounterRenderer};
pub use date::DateRenderer;
pub use deliver::{deliver, new_surface, text_style, Output};
pub use feed::{event_label, extract_titles, CalendarRenderer, RssRenderer};
pub use image::{ImageRenderer, ImageUrlRenderer};
pub use json_template::JsonTemplateRenderer;
pub use layout::Layout;
pub use push::{
    DisplayCopyRenderer, FirmwareRenderer, GrayLutRenderer, NfcUrlRenderer, RemoteApRenderer,
    SegStaticRenderer, TagCommandRenderer, TagConfigRenderer,
};
pub use qr::QrRenderer;
pub use radar::{parse_samples, rain_refresh, RadarRenderer, RadarSample};
pub use weather::{wind_speed_to_beaufort, ForecastRenderer, WeatherRenderer};

use crate::config::{ContentConfig, SharedRuntimeConfig};
use crate::http::Fetcher;
use crate::hwtype::HwType;
use crate::locale::Language;
use crate::render::{ImageCodec, ImageParams, Rasterizer};
use crate::storage::ContentStore;
use crate::tag::{TagRecord, NEVER};
use crate::transport::Transport;
use crate::vars::VariableStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(test)]
mod tests;

/// Content mode of a tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentMode {
    Image,
    Today,
    CountDays,
    CountHours,
    Weather,
    Firmware,
    ImageUrl,
    Forecast,
    RssFeed,
    QrCode,
    Calendar,
    RemoteAp,
    SegStatic,
    NfcUrl,
    GrayLut,
    Buienradar,
    TagCommand,
    TagConfig,
    JsonTemplate,
    DisplayCopy,
    ApInfo,
}

impl ContentMode {
    pub fn from_id(id: u8) -> Option<Self> {
        use ContentMode::*;
        Some(match id {
            0 => Image,
            1 => Today,
            2 => CountDays,
            3 => CountHours,
            4 => Weather,
            5 => Firmware,
            7 => ImageUrl,
            8 => Forecast,
            9 => RssFeed,
            10 => QrCode,
            11 => Calendar,
            12 => RemoteAp,
            13 => SegStatic,
            14 => NfcUrl,
            15 => GrayLut,
            16 => Buienradar,
            17 => TagCommand,
            18 => TagConfig,
            19 => JsonTemplate,
            20 => DisplayCopy,
            21 => ApInfo,
            _ => return None,
        })
    }

    pub fn id(self) -> u8 {
        use ContentMode::*;
        match self {
            Image => 0,
            Today => 1,
            CountDays => 2,
            CountHours => 3,
            Weather => 4,
            Firmware => 5,
            ImageUrl => 7,
            Forecast => 8,
            RssFeed => 9,
            QrCode => 10,
            Calendar => 11,
            RemoteAp => 12,
            SegStatic => 13,
            NfcUrl => 14,
            GrayLut => 15,
            Buienradar => 16,
            TagCommand => 17,
            TagConfig => 18,
            JsonTemplate => 19,
            DisplayCopy => 20,
            ApInfo => 21,
        }
    }
}

/// Collaborators shared by all renderers
pub struct ContentServices {
    pub store: Arc<dyn ContentStore>,
    pub vars: Arc<VariableStore>,
    pub fetcher: Fetcher,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub codec: Arc<dyn ImageCodec>,
    pub transport: Arc<dyn Transport>,
    pub config: ContentConfig,
    pub runtime: SharedRuntimeConfig,
}

impl ContentServices {
    pub fn language(&self) -> Language {
        let index = self
            .runtime
            .read()
            .map(|r| r.language)
            .unwrap_or_else(|e| e.into_inner().language);
        Language::from_index(index)
    }
}

/// State of one dispatch, owned by the renderer for its duration
pub struct RenderContext {
    /// Working copy of the tag; scheduling fields are written back afterwards
    pub tag: TagRecord,
    /// Mode config object; renderers insert only the keys they persist
    pub config: Map<String, Value>,
    pub params: ImageParams,
    pub hw: HwType,
    pub now: DateTime<FixedOffset>,
    pub button_pressed: bool,
}

impl RenderContext {
    pub fn new(
        tag: TagRecord,
        config: Map<String, Value>,
        hw: HwType,
        now: DateTime<FixedOffset>,
        button_pressed: bool,
    ) -> Self {
        let params = ImageParams::new(&hw, &tag);
        Self {
            tag,
            config,
            params,
            hw,
            now,
            button_pressed,
        }
    }

    /// Unix seconds of this dispatch
    pub fn timestamp(&self) -> i64 {
        self.now.timestamp()
    }

    pub fn schedule_in(&mut self, seconds: i64) {
        self.tag.next_update = self.timestamp() + seconds;
    }

    pub fn schedule_at(&mut self, ts: i64) {
        self.tag.next_update = ts;
    }

    pub fn schedule_never(&mut self) {
        self.tag.next_update = NEVER;
    }

    /// Decode this mode's typed settings from the config object
    pub fn settings<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.config.clone()))
            .context("Invalid mode config")
    }

    /// Store a value in the mode config
    pub fn persist(&mut self, key: &str, value: impl Into<Value>) {
        self.config.insert(key.to_string(), value.into());
    }

    pub fn is_segment(&self) -> bool {
        self.hw.is_segment
    }

    /// Where the last image sent to this tag is kept
    pub fn current_image_path(&self) -> String {
        format!("/current/{}.raw", self.tag.mac.to_hex())
    }

    pub fn layout(&self, services: &ContentServices, mode: ContentMode) -> Layout {
        Layout::load(services.store.as_ref(), mode, self.tag.hw_type)
    }
}

/// Renders one content mode
#[async_trait]
pub trait Renderer: Send + Sync {
    fn mode(&self) -> ContentMode;

    /// Seconds until the next attempt after `render` fails
    fn failure_backoff(&self) -> i64 {
        300
    }

    /// Produce content for `ctx.tag` and set its next update time
    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()>;
}

/// Content mode to renderer table
pub struct RendererRegistry {
    renderers: HashMap<ContentMode, Arc<dyn Renderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Registry with every built-in renderer
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for renderer in get_all_renderers() {
            registry.register(renderer);
        }
        registry
    }

    /// Register a renderer, replacing any existing one for its mode
    pub fn register(&mut self, renderer: Arc<dyn Renderer>) {
        self.renderers.insert(renderer.mode(), renderer);
    }

    pub fn get(&self, mode: ContentMode) -> Option<Arc<dyn Renderer>> {
        self.renderers.get(&mode).cloned()
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Returns all built-in renderers.
pub fn get_all_renderers() -> Vec<Arc<dyn Renderer>> {
    vec![
        Arc::new(ImageRenderer),
        Arc::new(DateRenderer),
        Arc::new(CounterRenderer::days()),
        Arc::new(CounterRenderer::hours()),
        Arc::new(WeatherRenderer),
        Arc::new(FirmwareRenderer),
        Arc::new(ImageUrlRenderer),
        Arc::new(ForecastRenderer),
        Arc::new(RssRenderer),
        Arc::new(QrRenderer),
        Arc::new(CalendarRenderer),
        Arc::new(RemoteApRenderer),
        Arc::new(SegStaticRenderer),
        Arc::new(NfcUrlRenderer),
        Arc::new(GrayLutRenderer),
        Arc::new(RadarRenderer),
        Arc::new(TagCommandRenderer),
        Arc::new(TagConfigRenderer),
        Arc::new(JsonTemplateRenderer),
        Arc::new(DisplayCopyRenderer),
        Arc::new(ApInfoRenderer),
    ]
}

/// Refresh interval in minutes; values below 3 select `fallback`
pub fn interval_minutes(interval: i64, fallback: i64) -> i64 {
    if interval < 3 {
        fallback
    } else {
        interval
    }
}

/// Clamp a minute count to a checkin hint
pub fn checkin_minutes(minutes: i64) -> u16 {
    minutes.clamp(0, u16::MAX as i64) as u16
}
