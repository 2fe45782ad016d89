//! Tag dispatcher.
//!
//! Runs one tag through the renderer of its content mode and writes the
//! outcome back onto a working copy of the tag record. Every failure is
//! contained to the tag: the record always comes back with a next update
//! time in the future.

use crate::content::{ContentMode, ContentServices, RenderContext, RendererRegistry};
use crate::hwtype::HwRegistry;
use crate::tag::{Mac, TagRecord};
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};


/// Retry delay for tags that cannot be rendered at all
pub const CONFIG_BACKOFF: i64 = 600;

/// Next update applied before the renderer runs
const DEFAULT_INTERVAL: i64 = 60;

/// Why a dispatch did not produce content
#[derive(Debug)]
pub enum DispatchError {
    /// No descriptor for the tag's hardware type
    UnknownHardware(u8),
    /// No renderer for the tag's content mode
    NoRenderer(u8),
    /// Mode config is not a JSON object
    InvalidConfig(String),
    /// The renderer failed; its backoff has been applied
    Render { mode: u8, source: anyhow::Error },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnknownHardware(hw) => write!(f, "unknown hardware type {:02X}", hw),
            DispatchError::NoRenderer(mode) => write!(f, "no renderer for content mode {}", mode),
            DispatchError::InvalidConfig(e) => write!(f, "invalid mode config: {}", e),
            DispatchError::Render { mode, source } => {
                write!(f, "content mode {} failed: {:#}", mode, source)
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Render { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

fn parse_config(raw: &str) -> Result<Map<String, Value>, DispatchError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(raw) {
        Ok(Value::Object(config)) => Ok(config),
        Ok(other) => Err(DispatchError::InvalidConfig(format!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(DispatchError::InvalidConfig(e.to_string())),
    }
}

/// Selects and runs the renderer for a tag
pub struct Dispatcher {
    hw: Arc<HwRegistry>,
    renderers: RendererRegistry,
    services: Arc<ContentServices>,
    /// The controller's own display, which shows AP status after a boot
    controller_mac: Option<Mac>,
}

impl Dispatcher {
    pub fn new(
        hw: Arc<HwRegistry>,
        renderers: RendererRegistry,
        services: Arc<ContentServices>,
        controller_mac: Option<Mac>,
    ) -> Self {
        Self {
            hw,
            renderers,
            services,
            controller_mac,
        }
    }

    pub fn services(&self) -> &Arc<ContentServices> {
        &self.services
    }

    /// Render `tag` for this cycle.
    ///
    /// `tag` is a working copy. On return its content mode, mode config,
    /// next update and custom-LUT flag hold the result of the dispatch, also
    /// when an error is returned.
    pub async fn dispatch(
        &self,
        tag: &mut TagRecord,
        button_pressed: bool,
        now: DateTime<FixedOffset>,
    ) -> Result<(), DispatchError> {
        let ts = now.timestamp();

        let Some(hw) = self.hw.resolve(tag.hw_type, self.services.store.as_ref()) else {
            tag.next_update = ts + CONFIG_BACKOFF;
            return Err(DispatchError::UnknownHardware(tag.hw_type));
        };

        if tag.wake_reason.is_boot()
            && tag.content_mode == ContentMode::Image.id()
            && self.controller_mac == Some(tag.mac)
        {
            info!(mac = %tag.mac, "Controller display booted, showing AP status");
            tag.content_mode = ContentMode::ApInfo.id();
            tag.next_update = ts;
        }

        let config = match parse_config(&tag.mode_config) {
            Ok(config) => config,
            Err(e) => {
                tag.next_update = ts + CONFIG_BACKOFF;
                return Err(e);
            }
        };

        let mode = tag.content_mode;
        let Some(renderer) = ContentMode::from_id(mode).and_then(|m| self.renderers.get(m))
        else {
            tag.next_update = ts + CONFIG_BACKOFF;
            return Err(DispatchError::NoRenderer(mode));
        };

        debug!(mac = %tag.mac, mode, button_pressed, "Rendering");
        let mut ctx = RenderContext::new(tag.clone(), config, hw, now, button_pressed);
        ctx.schedule_in(DEFAULT_INTERVAL);
        let result = renderer.render(&mut ctx, &self.services).await;

        match result {
            Ok(()) => {
                let RenderContext {
                    tag: rendered,
                    config,
                    ..
                } = ctx;
                *tag = rendered;
                tag.mode_config = Value::Object(config).to_string();
                if tag.next_update <= ts {
                    tag.next_update = ts + DEFAULT_INTERVAL;
                }
                Ok(())
            }
            Err(source) => {
                // Config and content stay as they were before this attempt
                tag.next_update = ts + renderer.failure_backoff();
                Err(DispatchError::Render { mode, source })
            }
        }
    }
}
