// Hardware descriptors and per-hardware layout templates

use crate::storage::ContentStore;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};


/// Segmented (non-raster) display: ten characters plus a symbol bitmask
pub const SOLUM_SEG_UK: u8 = 0xF0;

/// Maximum `usetemplate` redirects followed while resolving a layout
const MAX_TEMPLATE_HOPS: usize = 4;

/// Static geometry of a tag type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct HwType {
    pub width: u16,
    pub height: u16,
    /// Bits per pixel of the panel; 2 means black/white/red
    pub bpp: u8,
    #[serde(default, rename = "rotatebuffer")]
    pub rotate_buffer: u8,
    #[serde(default)]
    pub is_segment: bool,
}

/// Hardware descriptor registry
///
/// Built-in descriptors cover the common panels; other types are read lazily
/// from `/tagtypes/XX.json` in the content store and cached.
pub struct HwRegistry {
    types: DashMap<u8, HwType>,
}

impl HwRegistry {
    /// Registry without any descriptors
    pub fn empty() -> Self {
        Self {
            types: DashMap::new(),
        }
    }

    /// Registry preloaded with the built-in descriptors
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register(0x00, HwType::raster(152, 152, 2));
        registry.register(0x01, HwType::raster(296, 128, 2));
        registry.register(0x02, HwType::raster(400, 300, 2));
        registry.register(
            SOLUM_SEG_UK,
            HwType {
                width: 0,
                height: 0,
                bpp: 1,
                rotate_buffer: 0,
                is_segment: true,
            },
        );
        registry
    }

    pub fn register(&self, hw_type: u8, descriptor: HwType) {
        self.types.insert(hw_type, descriptor);
    }

    pub fn get(&self, hw_type: u8) -> Option<HwType> {
        self.types.get(&hw_type).map(|t| *t)
    }

    /// Look up a descriptor, falling back to the store's tagtype file
    pub fn resolve(&self, hw_type: u8, store: &dyn ContentStore) -> Option<HwType> {
        if let Some(known) = self.get(hw_type) {
            return Some(known);
        }

        let path = tagtype_path(hw_type);
        let bytes = store.read(&path).ok()?;
        match serde_json::from_slice::<HwType>(&bytes) {
            Ok(descriptor) if descriptor.bpp > 0 => {
                debug!(hw_type, path = %path, "Loaded hardware descriptor");
                self.register(hw_type, descriptor);
                Some(descriptor)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(hw_type, path = %path, error = %e, "Invalid hardware descriptor");
                None
            }
        }
    }
}

impl Default for HwRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HwType {
    pub fn raster(width: u16, height: u16, bpp: u8) -> Self {
        Self {
            width,
            height,
            bpp,
            rotate_buffer: 0,
            is_segment: false,
        }
    }
}

pub fn tagtype_path(hw_type: u8) -> String {
    format!("/tagtypes/{:02X}.json", hw_type)
}

/// Layout template of `mode_id` for `hw_type`.
///
/// Reads `template.{mode_id}` from the tagtype file, following `usetemplate`
/// redirects to other hardware types. Returns `Value::Null` when nothing is
/// found so callers read defaults from an empty layout.
pub fn load_layout(store: &dyn ContentStore, mode_id: u8, hw_type: u8) -> Value {
    let key = mode_id.to_string();
    let mut current = hw_type;

    for _ in 0..=MAX_TEMPLATE_HOPS {
        let path = tagtype_path(current);
        let doc: Value = match store.read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %path, error = %e, "json error in tagtype file");
                    return Value::Null;
                }
            },
            Err(_) => {
                warn!(path = %path, "Failed to open tagtype file");
                return Value::Null;
            }
        };

        if let Some(layout) = doc.get("template").and_then(|t| t.get(&key)) {
            return layout.clone();
        }
        match doc.get("usetemplate").and_then(Value::as_u64) {
            Some(next) if next <= u8::MAX as u64 => current = next as u8,
            _ => {
                warn!(path = %path, mode = mode_id, "No layout template");
                return Value::Null;
            }
        }
    }

    warn!(hw_type, mode = mode_id, "Too many usetemplate redirects");
    Value::Null
}
