// Named controller variables with change tracking

use dashmap::DashMap;

#[cfg(test)]
mod tests;

/// Controller-state variables that drive the status panel
pub const AP_TAGCOUNT: &str = "ap_tagcount";
pub const AP_IP: &str = "ap_ip";
pub const AP_CHANNEL: &str = "ap_ch";

/// A stored variable
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub value: String,
    /// Written since the last invalidation sweep
    pub changed: bool,
}

/// Process-scoped variable table.
///
/// Entries are created on first write and never deleted. Writers set the
/// `changed` flag; [`VariableStore::sweep_changed`] clears it once an
/// invalidation pass has scanned every tag.
pub struct VariableStore {
    vars: DashMap<String, Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self {
            vars: DashMap::new(),
        }
    }

    /// Set a variable. Marks it changed when the value is new or differs.
    pub fn set(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let mut entry = self.vars.entry(name.to_string()).or_insert_with(|| Variable {
            value: String::new(),
            changed: true,
        });
        if entry.value != value {
            entry.value = value;
            entry.changed = true;
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).map(|v| v.value.clone())
    }

    pub fn is_changed(&self, name: &str) -> bool {
        self.vars.get(name).map(|v| v.changed).unwrap_or(false)
    }

    /// Names currently flagged as changed
    pub fn changed_names(&self) -> Vec<String> {
        self.vars
            .iter()
            .filter(|v| v.changed)
            .map(|v| v.key().clone())
            .collect()
    }

    /// Clear every changed flag, returning the names that were set
    pub fn sweep_changed(&self) -> Vec<String> {
        let mut swept = Vec::new();
        for mut v in self.vars.iter_mut() {
            if v.changed {
                v.changed = false;
                swept.push(v.key().clone());
            }
        }
        swept
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Replace `{name}` placeholders with known variable values.
    ///
    /// Unknown names are left in place.
    pub fn expand_inline(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find('{') {
            let after_open = &rest[open + 1..];
            let close = match after_open.find('}') {
                Some(close) => close,
                None => break,
            };
            let name = &after_open[..close];
            out.push_str(&rest[..open]);
            match self.get(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = &after_open[close + 1..];
        }

        out.push_str(rest);
        out
    }
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}
