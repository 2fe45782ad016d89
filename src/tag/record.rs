use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `next_update` value meaning "never refresh automatically"
pub const NEVER: i64 = 3_216_153_600;

/// 8-byte device address, the identity key of a tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mac(pub [u8; 8]);

impl Mac {
    /// Uppercase hex, most significant byte first (as printed on the tag label)
    pub fn to_hex(&self) -> String {
        self.0.iter().rev().map(|b| format!("{:02X}", b)).collect()
    }
}

impl fmt::Display for Mac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// MAC parse errors
#[derive(Debug, Clone, PartialEq)]
pub enum MacParseError {
    InvalidLength(usize),
    InvalidHex(String),
}

impl fmt::Display for MacParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacParseError::InvalidLength(n) => {
                write!(f, "mac must be 16 hex characters, got {}", n)
            }
            MacParseError::InvalidHex(s) => write!(f, "invalid hex in mac '{}'", s),
        }
    }
}

impl std::error::Error for MacParseError {}

impl FromStr for Mac {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        if cleaned.len() != 16 {
            return Err(MacParseError::InvalidLength(cleaned.len()));
        }
        if !cleaned.is_ascii() {
            return Err(MacParseError::InvalidHex(s.to_string()));
        }
        let mut bytes = [0u8; 8];
        for (i, slot) in bytes.iter_mut().rev().enumerate() {
            let pair = &cleaned[i * 2..i * 2 + 2];
            *slot = u8::from_str_radix(pair, 16)
                .map_err(|_| MacParseError::InvalidHex(s.to_string()))?;
        }
        Ok(Mac(bytes))
    }
}

impl TryFrom<String> for Mac {
    type Error = MacParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Mac> for String {
    fn from(mac: Mac) -> Self {
        mac.to_hex()
    }
}

/// Why a tag last woke up, as reported on checkin
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeReason {
    #[default]
    None,
    FirstBoot,
    WatchdogReset,
    /// Button press
    Gpio,
    Nfc,
}

impl WakeReason {
    /// Map the radio protocol's wake reason byte
    pub fn from_code(code: u8) -> Self {
        match code {
            0x02 => WakeReason::Gpio,
            0x03 => WakeReason::Nfc,
            0xFC => WakeReason::FirstBoot,
            0xFE => WakeReason::WatchdogReset,
            _ => WakeReason::None,
        }
    }

    /// Wakeups that demand a render regardless of `next_update`
    pub fn forces_render(self) -> bool {
        matches!(self, WakeReason::Gpio | WakeReason::Nfc)
    }

    pub fn is_boot(self) -> bool {
        matches!(self, WakeReason::FirstBoot | WakeReason::WatchdogReset)
    }
}

/// One physical display device
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TagRecord {
    pub mac: Mac,

    /// Hardware type, selects the hardware descriptor
    pub hw_type: u8,

    /// Content mode (0-21), selects the renderer
    pub content_mode: u8,

    /// Mode-config JSON object; keys prefixed `#` hold internally tracked state
    pub mode_config: String,

    /// Unix seconds of the next automatic render
    pub next_update: i64,

    /// Unix seconds of the next expected checkin
    pub expected_next_checkin: i64,

    /// Another operation is queued for this tag
    pub pending: bool,

    /// Minutes of an idle instruction already issued (0 = none)
    pub pending_idle: u16,

    pub wake_reason: WakeReason,
    pub rotate: u8,
    pub has_custom_lut: bool,
    pub lut: u8,

    /// Reached through a relay rather than directly
    pub is_external: bool,

    /// Last seen signal strength; zero means unreachable
    pub rssi: i8,
}

impl TagRecord {
    pub fn new(mac: Mac, hw_type: u8) -> Self {
        Self {
            mac,
            hw_type,
            content_mode: 0,
            mode_config: "{}".to_string(),
            next_update: 0,
            expected_next_checkin: 0,
            pending: false,
            pending_idle: 0,
            wake_reason: WakeReason::None,
            rotate: 0,
            has_custom_lut: false,
            lut: 0,
            is_external: false,
            rssi: 0,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.rssi != 0
    }
}
