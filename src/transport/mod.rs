// Outbound transport to tags and the payload formats it carries

mod payload;

pub use payload::{nfc_url_record, parse_lut, TagSettings, LUT_LEN};

use crate::tag::Mac;
use std::sync::Mutex;
use tracing::info;

#[cfg(test)]
mod tests;

/// Data type tags understood by the tags
pub mod data_type {
    pub const FW_UPDATE: u8 = 0x03;
    pub const IMG_RAW_1BPP: u8 = 0x20;
    pub const IMG_RAW_2BPP: u8 = 0x21;
    pub const NFC_RAW_CONTENT: u8 = 0xA0;
    pub const TAG_CONFIG: u8 = 0xA8;
    pub const CUSTOM_LUT_OTA: u8 = 0xB0;
}

/// Delivers payloads to tags.
///
/// Calls only queue work; delivery happens on the tag's next checkin, which
/// the transport reports back through `TagDb::report_checkin`.
pub trait Transport: Send + Sync {
    /// Queue a data payload. `next_checkin` is the checkin interval hint in
    /// minutes handed to the tag with the data.
    fn send_image(&self, mac: &Mac, data_type: u8, payload: &[u8], next_checkin: u16) -> bool;

    /// Show text on a segmented display
    fn send_segments(&self, mac: &Mac, text: &str, symbols: u16, invert: bool, direct: bool)
        -> bool;

    /// Tell a tag to sleep for `minutes` before its next checkin
    fn send_idle(&self, mac: &Mac, minutes: u16);

    fn send_raw_command(&self, mac: &Mac, opcode: u8, payload: &[u8], direct: bool) -> bool;
}

/// Transport that only logs what would be sent
pub struct LogTransport;

impl Transport for LogTransport {
    fn send_image(&self, mac: &Mac, data_type: u8, payload: &[u8], next_checkin: u16) -> bool {
        info!(
            mac = %mac,
            data_type,
            bytes = payload.len(),
            next_checkin,
            "Data queued"
        );
        true
    }

    fn send_segments(
        &self,
        mac: &Mac,
        text: &str,
        symbols: u16,
        invert: bool,
        direct: bool,
    ) -> bool {
        info!(mac = %mac, text, symbols, invert, direct, "Segment data queued");
        true
    }

    fn send_idle(&self, mac: &Mac, minutes: u16) {
        info!(mac = %mac, minutes, "Idle instruction queued");
    }

    fn send_raw_command(&self, mac: &Mac, opcode: u8, payload: &[u8], direct: bool) -> bool {
        info!(mac = %mac, opcode, bytes = payload.len(), direct, "Command queued");
        true
    }
}

/// A call made on a [`RecordingTransport`]
#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    Image {
        mac: Mac,
        data_type: u8,
        payload: Vec<u8>,
        next_checkin: u16,
    },
    Segments {
        mac: Mac,
        text: String,
        symbols: u16,
        invert: bool,
        direct: bool,
    },
    Idle {
        mac: Mac,
        minutes: u16,
    },
    Command {
        mac: Mac,
        opcode: u8,
        payload: Vec<u8>,
        direct: bool,
    },
}

/// Transport that records every call
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    accept: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            accept: true,
        }
    }

    /// Transport whose queue is full: payload sends return false
    pub fn rejecting() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            accept: false,
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Calls addressed to `mac`
    pub fn sent_to(&self, mac: &Mac) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| s.mac() == mac)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(sent);
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Sent {
    pub fn mac(&self) -> &Mac {
        match self {
            Sent::Image { mac, .. }
            | Sent::Segments { mac, .. }
            | Sent::Idle { mac, .. }
            | Sent::Command { mac, .. } => mac,
        }
    }
}

impl Transport for RecordingTransport {
    fn send_image(&self, mac: &Mac, data_type: u8, payload: &[u8], next_checkin: u16) -> bool {
        self.record(Sent::Image {
            mac: *mac,
            data_type,
            payload: payload.to_vec(),
            next_checkin,
        });
        self.accept
    }

    fn send_segments(
        &self,
        mac: &Mac,
        text: &str,
        symbols: u16,
        invert: bool,
        direct: bool,
    ) -> bool {
        self.record(Sent::Segments {
            mac: *mac,
            text: text.to_string(),
            symbols,
            invert,
            direct,
        });
        self.accept
    }

    fn send_idle(&self, mac: &Mac, minutes: u16) {
        self.record(Sent::Idle { mac: *mac, minutes });
    }

    fn send_raw_command(&self, mac: &Mac, opcode: u8, payload: &[u8], direct: bool) -> bool {
        self.record(Sent::Command {
            mac: *mac,
            opcode,
            payload: payload.to_vec(),
            direct,
        });
        self.accept
    }
}
