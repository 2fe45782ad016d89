pub mod runtime;
pub use runtime::{new_runtime_config, RunStatus, RuntimeConfig, SharedRuntimeConfig};

use crate::tag::Mac;
use serde::Deserialize;
use std::path::PathBuf;

/// Complete controller configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub controller: ControllerSection,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Scheduling cycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// How often a scheduling cycle runs (seconds)
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_seconds: u64,
    /// Renders are suppressed while free content storage is at or below this
    #[serde(default = "default_storage_headroom")]
    pub storage_headroom_bytes: u64,
    /// A tag is "checking in now" when its expected checkin lies in
    /// `[now - checkin_lead, now + checkin_lag)`
    #[serde(default = "default_checkin_lead")]
    pub checkin_lead_seconds: i64,
    #[serde(default = "default_checkin_lag")]
    pub checkin_lag_seconds: i64,
}

fn default_cycle_interval() -> u64 {
    1
}

fn default_storage_headroom() -> u64 {
    31_000
}

fn default_checkin_lead() -> i64 {
    10
}

fn default_checkin_lag() -> i64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_interval_seconds: default_cycle_interval(),
            storage_headroom_bytes: default_storage_headroom(),
            checkin_lead_seconds: default_checkin_lead(),
            checkin_lag_seconds: default_checkin_lag(),
        }
    }
}

/// Content sources and storage
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Root of the content store (templates, images, layouts)
    #[serde(default = "default_content_dir")]
    pub directory: PathBuf,
    /// Nominal capacity of the content store, used for free-space checks
    #[serde(default = "default_capacity")]
    pub capacity_bytes: u64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    #[serde(default = "default_calendar_timeout")]
    pub calendar_timeout_seconds: u64,
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_radar_url")]
    pub radar_url: String,
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("/var/lib/tagflux/content")
}

fn default_capacity() -> u64 {
    4 * 1024 * 1024
}

fn default_http_timeout() -> u64 {
    5
}

fn default_calendar_timeout() -> u64 {
    10
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_radar_url() -> String {
    "https://gps.buienradar.nl/getrr.php".to_string()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            directory: default_content_dir(),
            capacity_bytes: default_capacity(),
            http_timeout_seconds: default_http_timeout(),
            calendar_timeout_seconds: default_calendar_timeout(),
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            radar_url: default_radar_url(),
        }
    }
}

/// Identity of the controller itself
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerSection {
    /// MAC of the controller's own display, remapped to the status panel on first boot
    #[serde(default)]
    pub mac: Option<Mac>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            content: ContentConfig::default(),
            controller: ControllerSection::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> anyhow::Result<ControllerConfig> {
    use anyhow::Context;

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: ControllerConfig =
        toml::from_str(&contents).context("Failed to parse controller config")?;
    Ok(config)
}
