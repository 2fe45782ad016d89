use super::record::{Mac, TagRecord, WakeReason};
use anyhow::{Context, Result};
use dashmap::DashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::RwLock;
use tracing::info;

/// Tag database
///
/// Records live in a concurrent map so transport callbacks can update
/// RSSI/checkin fields while a scheduling pass is running; a separate index
/// keeps registration order for the scheduler.
pub struct TagDb {
    /// Primary storage: mac -> record
    tags: DashMap<Mac, TagRecord>,
    /// Registration order
    order: RwLock<Vec<Mac>>,
}

impl TagDb {
    pub fn new() -> Self {
        Self {
            tags: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Insert or replace a record. Returns true if the tag is new.
    pub fn register(&self, record: TagRecord) -> bool {
        let mac = record.mac;
        let is_new = self.tags.insert(mac, record).is_none();
        if is_new {
            self.order
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .push(mac);
        }
        is_new
    }

    pub fn get(&self, mac: &Mac) -> Option<TagRecord> {
        self.tags.get(mac).map(|t| t.clone())
    }

    /// All macs in registration order
    pub fn macs(&self) -> Vec<Mac> {
        self.order
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Mutate a record in place, holding its entry lock for the duration of `f`
    pub fn update<R>(&self, mac: &Mac, f: impl FnOnce(&mut TagRecord) -> R) -> Option<R> {
        self.tags.get_mut(mac).map(|mut t| f(t.value_mut()))
    }

    /// Transport callback: a tag checked in.
    ///
    /// The checkin consumes any idle instruction issued for it.
    pub fn report_checkin(
        &self,
        mac: &Mac,
        rssi: i8,
        wake_reason: WakeReason,
        expected_next_checkin: i64,
    ) -> bool {
        self.update(mac, |t| {
            t.rssi = rssi;
            if wake_reason != WakeReason::None {
                t.wake_reason = wake_reason;
            }
            t.expected_next_checkin = expected_next_checkin;
            t.pending_idle = 0;
        })
        .is_some()
    }

    /// Transport callback: queued data was picked up (or dropped)
    pub fn set_pending(&self, mac: &Mac, pending: bool) -> bool {
        self.update(mac, |t| t.pending = pending).is_some()
    }

    /// Record an idle instruction issued to the tag
    pub fn set_pending_idle(&self, mac: &Mac, minutes: u16) -> bool {
        self.update(mac, |t| t.pending_idle = minutes).is_some()
    }

    /// Transport callback: the tag acknowledged or dropped its idle instruction
    pub fn clear_pending_idle(&self, mac: &Mac) -> bool {
        self.update(mac, |t| t.pending_idle = 0).is_some()
    }

    /// Write back the fields a dispatch owns, leaving transport-owned fields alone.
    ///
    /// `consumed` is the wake reason the dispatch acted on. It is cleared only
    /// if no newer wake was reported while the dispatch was running.
    pub fn apply_dispatch(&self, dispatched: &TagRecord, consumed: WakeReason) -> bool {
        self.update(&dispatched.mac, |t| {
            t.content_mode = dispatched.content_mode;
            t.mode_config = dispatched.mode_config.clone();
            t.next_update = dispatched.next_update;
            t.has_custom_lut = dispatched.has_custom_lut;
            if t.wake_reason == consumed {
                t.wake_reason = WakeReason::None;
            }
        })
        .is_some()
    }

    /// Save all records as JSON, in registration order.
    ///
    /// Uses atomic write: writes to .tmp file, fsyncs, then renames.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let records: Vec<TagRecord> = self.macs().iter().filter_map(|m| self.get(m)).collect();
        let json = serde_json::to_string_pretty(&records)
            .context("Failed to serialize tag database")?;

        let tmp_path = path.with_extension("tmp");
        {
            let mut file =
                File::create(&tmp_path).context("Failed to create temporary tag database file")?;
            file.write_all(json.as_bytes())
                .context("Failed to write tag database")?;
            file.sync_all()
                .context("Failed to sync tag database to disk")?;
        }
        fs::rename(&tmp_path, path).context("Failed to rename temporary tag database file")?;

        info!(tags = records.len(), path = %path.display(), "Tag database saved");
        Ok(())
    }

    /// Load records saved by [`TagDb::save_to_file`]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).context("Failed to read tag database")?;
        let records: Vec<TagRecord> =
            serde_json::from_str(&json).context("Failed to deserialize tag database")?;

        let db = Self::new();
        for record in records {
            db.register(record);
        }

        info!(tags = db.len(), path = %path.display(), "Tag database loaded");
        Ok(db)
    }
}

impl Default for TagDb {
    fn default() -> Self {
        Self::new()
    }
}
