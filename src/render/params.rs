use crate::hwtype::HwType;
use crate::tag::TagRecord;
use crate::transport::data_type;

/// Segment displays show this many characters
pub const SEGMENT_CHARS: usize = 10;

/// Image parameters for one dispatch.
///
/// Built from the hardware descriptor at the start of a dispatch and handed
/// to exactly one renderer; never outlives the dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageParams {
    pub width: u16,
    pub height: u16,
    /// Panel bit depth
    pub bpp: u8,
    /// Bit depth of the drawing surface actually allocated
    pub buffer_bpp: u8,
    pub rotate_buffer: u8,
    /// Transport data type of the produced buffer
    pub data_type: u8,
    pub has_red: bool,
    pub dither: bool,
    pub invert: bool,
    pub rotate: u8,
    pub gray_lut: bool,
    /// Segment display text
    pub segments: String,
    /// Segment display symbol bitmask
    pub symbols: u16,
}

impl ImageParams {
    pub fn new(hw: &HwType, tag: &TagRecord) -> Self {
        Self {
            width: hw.width,
            height: hw.height,
            bpp: hw.bpp,
            buffer_bpp: 8,
            rotate_buffer: hw.rotate_buffer,
            data_type: data_type::IMG_RAW_1BPP,
            has_red: false,
            dither: false,
            invert: false,
            rotate: tag.rotate,
            gray_lut: tag.has_custom_lut && tag.lut != 1,
            segments: String::new(),
            symbols: 0,
        }
    }

    /// Set segment text, truncated to the display width
    pub fn set_segments(&mut self, text: &str, symbols: u16) {
        self.segments = text.chars().take(SEGMENT_CHARS).collect();
        self.symbols = symbols;
    }
}
