/// Length of a custom waveform table
pub const LUT_LEN: usize = 76;

/// Longest URL that fits the single-byte NDEF length fields
const MAX_NDEF_URL: usize = 250;

/// NDEF TLV carrying one URI record, without a URI prefix code.
///
/// URLs longer than the record format allows are truncated.
pub fn nfc_url_record(url: &str) -> Vec<u8> {
    let url = &url.as_bytes()[..url.len().min(MAX_NDEF_URL)];
    let len = url.len() as u8;

    let mut data = Vec::with_capacity(url.len() + 8);
    data.push(0x03); // NDEF message TLV
    data.push(len + 5);
    data.push(0xD1); // MB|ME|SR, well known type
    data.push(0x01); // type length
    data.push(len + 1); // payload length
    data.push(0x55); // 'U'
    data.push(0x00); // no prefix
    data.extend_from_slice(url);
    data.push(0xFE); // terminator TLV
    data
}

/// Parse up to [`LUT_LEN`] hex bytes separated by commas or whitespace.
///
/// Unparseable entries become 0; missing trailing entries are zero-filled.
pub fn parse_lut(input: &str) -> Vec<u8> {
    let mut waveform = vec![0u8; LUT_LEN];
    let values = input
        .split([',', ' ', '\t'])
        .filter(|s| !s.is_empty())
        .take(LUT_LEN);

    for (slot, value) in waveform.iter_mut().zip(values) {
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        *slot = u32::from_str_radix(digits, 16).unwrap_or(0) as u8;
    }
    waveform
}

/// Tag settings block pushed with data type 0xA8
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagSettings {
    pub fast_boot: u8,
    pub rf_wake: u8,
    pub tag_roaming: u8,
    pub scan_for_ap_after_timeout: u8,
    pub low_bat_symbol: u8,
    pub no_rf_symbol: u8,
    pub fixed_channel: u8,
    /// Millivolts
    pub bat_low_voltage: u16,
}

impl TagSettings {
    pub const VERSION: u8 = 1;

    /// Packed little-endian layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![
            Self::VERSION,
            self.fast_boot,
            self.rf_wake,
            self.tag_roaming,
            self.scan_for_ap_after_timeout,
            self.low_bat_symbol,
            self.no_rf_symbol,
            0, // fast boot capabilities
            0, // custom mode
        ];
        out.extend_from_slice(&self.bat_low_voltage.to_le_bytes());
        out.push(1); // minimum checkin time
        out.push(self.fixed_channel);
        out
    }
}
