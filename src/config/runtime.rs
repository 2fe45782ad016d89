use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Global run state of the content scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Scheduling cycles return immediately
    Stop,
    /// No renders, idle instructions are still issued
    Pause,
    Run,
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stop" => Ok(RunStatus::Stop),
            "pause" => Ok(RunStatus::Pause),
            "run" => Ok(RunStatus::Run),
            other => Err(format!("unknown run status '{}'", other)),
        }
    }
}

/// Runtime-configurable settings. Changes take effect on the next scheduling
/// cycle without restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub run_status: RunStatus,
    /// Start hour of the nightly sleep window (0-23)
    pub sleep_time1: u8,
    /// End hour of the nightly sleep window (0-23); equal to start disables it
    pub sleep_time2: u8,
    /// Upper bound for idle instructions (minutes)
    pub max_sleep: u16,
    /// Keep tags awake while UI clients are connected
    pub stop_sleep: bool,
    /// 0 = English, 1 = Dutch, 2 = German
    pub language: u8,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            run_status: RunStatus::Run,
            sleep_time1: 0,
            sleep_time2: 0,
            max_sleep: 60,
            stop_sleep: true,
            language: 0,
        }
    }
}

impl RuntimeConfig {
    /// Build from env vars, falling back to defaults.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `TAGFLUX_*` env overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("TAGFLUX_RUN_STATUS") {
            if let Ok(s) = v.parse::<RunStatus>() {
                self.run_status = s;
            }
        }
        if let Ok(v) = std::env::var("TAGFLUX_SLEEP_TIME1") {
            if let Ok(h) = v.parse::<u8>() {
                self.sleep_time1 = h % 24;
            }
        }
        if let Ok(v) = std::env::var("TAGFLUX_SLEEP_TIME2") {
            if let Ok(h) = v.parse::<u8>() {
                self.sleep_time2 = h % 24;
            }
        }
        if let Ok(v) = std::env::var("TAGFLUX_MAX_SLEEP") {
            if let Ok(n) = v.parse::<u16>() {
                self.max_sleep = n;
            }
        }
        if let Ok(v) = std::env::var("TAGFLUX_STOP_SLEEP") {
            if let Ok(b) = v.parse::<bool>() {
                self.stop_sleep = b;
            }
        }
        if let Ok(v) = std::env::var("TAGFLUX_LANGUAGE") {
            if let Ok(n) = v.parse::<u8>() {
                self.language = n;
            }
        }

        self
    }
}

pub type SharedRuntimeConfig = Arc<RwLock<RuntimeConfig>>;

pub fn new_runtime_config(base: RuntimeConfig) -> SharedRuntimeConfig {
    Arc::new(RwLock::new(base.with_env_overrides()))
}
