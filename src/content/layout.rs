use super::lenient::{to_int, to_text};
use super::ContentMode;
use crate::hwtype::load_layout;
use crate::storage::ContentStore;
use serde_json::Value;

/// Per-hardware positions and fonts for a content mode.
///
/// Fields are arrays such as `"date": [x, y, font]`; missing entries read as
/// zero or empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout(pub Value);

impl Layout {
    pub fn load(store: &dyn ContentStore, mode: ContentMode, hw_type: u8) -> Self {
        Layout(load_layout(store, mode.id(), hw_type))
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn get(&self, key: &str) -> &Value {
        self.0.get(key).unwrap_or(&Value::Null)
    }

    /// Integer at `key[index]`, or `key` itself when `index` is `None`
    pub fn int(&self, key: &str, index: usize) -> i32 {
        to_int(self.at(key, index)) as i32
    }

    pub fn int_or(&self, key: &str, index: usize, default: i32) -> i32 {
        match self.at(key, index) {
            Value::Null => default,
            v => to_int(v) as i32,
        }
    }

    pub fn text(&self, key: &str, index: usize) -> String {
        to_text(self.at(key, index))
    }

    fn at(&self, key: &str, index: usize) -> &Value {
        self.get(key).get(index).unwrap_or(&Value::Null)
    }
}
