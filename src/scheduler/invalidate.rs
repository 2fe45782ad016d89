// Variable-driven re-render of templates and the AP status panel

use super::Scheduler;
use crate::content::ContentMode;
use crate::storage::normalize_path;
use crate::tag::TagRecord;
use crate::vars::{VariableStore, AP_CHANNEL, AP_IP, AP_TAGCOUNT};
use serde_json::Value;
use tracing::{debug, warn};

const AP_VARIABLES: [&str; 3] = [AP_TAGCOUNT, AP_IP, AP_CHANNEL];

impl Scheduler {
    /// Force a re-render of every tag whose content depends on a changed
    /// variable, then clear all changed flags.
    ///
    /// Changed flags are read per tag, so a variable written during the scan
    /// is seen by the tags checked after the write. Returns the number of
    /// tags invalidated.
    pub fn check_vars(&self) -> usize {
        let vars = &self.dispatcher.services().vars;
        if vars.changed_names().is_empty() {
            return 0;
        }

        let mut invalidated = 0;
        for mac in self.tags.macs() {
            let Some(tag) = self.tags.get(&mac) else {
                continue;
            };
            if self.depends_on_changed(&tag, vars) {
                self.tags.update(&mac, |t| t.next_update = 0);
                debug!(mac = %mac, mode = tag.content_mode, "Variable changed, render forced");
                invalidated += 1;
            }
        }

        vars.sweep_changed();
        invalidated
    }

    fn depends_on_changed(&self, tag: &TagRecord, vars: &VariableStore) -> bool {
        match ContentMode::from_id(tag.content_mode) {
            Some(ContentMode::JsonTemplate) => {
                let changed = vars.changed_names();
                if changed.is_empty() {
                    return false;
                }
                let Some(template) = self.template_source(tag) else {
                    return false;
                };
                let text = String::from_utf8_lossy(&template);
                changed.iter().any(|name| text.contains(name.as_str()))
            }
            Some(ContentMode::ApInfo) => AP_VARIABLES.iter().any(|name| vars.is_changed(name)),
            _ => false,
        }
    }

    /// Raw bytes of the template file a tag draws from
    fn template_source(&self, tag: &TagRecord) -> Option<Vec<u8>> {
        let config: Value = serde_json::from_str(&tag.mode_config).ok()?;
        let filename = config.get("filename")?.as_str()?;
        if filename.is_empty() {
            return None;
        }
        let path = normalize_path(filename);
        match self.dispatcher.services().store.read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(mac = %tag.mac, file = %path, error = %e, "Template file unreadable");
                None
            }
        }
    }
}
