// Content store: templates, images, hardware layouts and rendered buffers

use anyhow::{Context, Result};
use dashmap::DashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};


/// File access used by renderers and the variable invalidator.
///
/// Paths are store-absolute (`/tagtypes/01.json`); a missing leading slash is
/// tolerated.
pub trait ContentStore: Send + Sync {
    fn read(&self, path: &str) -> Result<Vec<u8>>;
    fn write(&self, path: &str, data: &[u8]) -> Result<()>;
    fn exists(&self, path: &str) -> bool;
    fn remove(&self, path: &str) -> Result<()>;
    /// Bytes still available for new content
    fn free_space(&self) -> u64;
}

/// Normalize to a store-absolute path
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Content store rooted at a directory on disk.
///
/// The directory is measured once when opened; after that, usage is tracked
/// through `write` and `remove`.
pub struct DirStore {
    root: PathBuf,
    capacity: u64,
    used: AtomicU64,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>, capacity: u64) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).context("Failed to create content directory")?;
        let used = AtomicU64::new(Self::used_bytes(&root));
        Ok(Self {
            root,
            capacity,
            used,
        })
    }

    fn file_len(path: &Path) -> u64 {
        fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }

    fn release(&self, bytes: u64) {
        let _ = self
            .used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |u| {
                Some(u.saturating_sub(bytes))
            });
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let relative = normalize_path(path);
        self.root.join(relative.trim_start_matches('/'))
    }

    fn used_bytes(dir: &Path) -> u64 {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut total = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                total += Self::used_bytes(&path);
            } else if let Ok(meta) = entry.metadata() {
                total += meta.len();
            }
        }
        total
    }
}

impl ContentStore for DirStore {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(self.resolve(path)).with_context(|| format!("Failed to read {}", path))
    }

    /// Uses atomic write: writes to .tmp file, fsyncs, then renames.
    fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).context("Failed to create content subdirectory")?;
        }

        let replaced = Self::file_len(&target);
        let tmp_path = target.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)
                .with_context(|| format!("Failed to create temporary file for {}", path))?;
            file.write_all(data)
                .with_context(|| format!("Failed to write {}", path))?;
            file.sync_all()
                .with_context(|| format!("Failed to sync {}", path))?;
        }
        fs::rename(&tmp_path, &target)
            .with_context(|| format!("Failed to rename temporary file for {}", path))?;

        self.release(replaced);
        self.used.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn remove(&self, path: &str) -> Result<()> {
        let target = self.resolve(path);
        let len = Self::file_len(&target);
        fs::remove_file(&target).with_context(|| format!("Failed to remove {}", path))?;
        self.release(len);
        Ok(())
    }

    fn free_space(&self) -> u64 {
        self.capacity
            .saturating_sub(self.used.load(Ordering::Relaxed))
    }
}

/// In-memory content store
pub struct MemoryStore {
    files: DashMap<String, Vec<u8>>,
    capacity: u64,
}

impl MemoryStore {
    pub fn new(capacity: u64) -> Self {
        Self {
            files: DashMap::new(),
            capacity,
        }
    }

    /// Builder-style insert
    pub fn with_file(self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.files.insert(normalize_path(path), data.into());
        self
    }
}

impl ContentStore for MemoryStore {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(&normalize_path(path))
            .map(|f| f.clone())
            .with_context(|| format!("File {} not found", path))
    }

    fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        self.files.insert(normalize_path(path), data.to_vec());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.files
            .remove(&normalize_path(path))
            .map(|_| ())
            .with_context(|| format!("File {} not found", path))
    }

    fn free_space(&self) -> u64 {
        let used: u64 = self.files.iter().map(|f| f.value().len() as u64).sum();
        self.capacity.saturating_sub(used)
    }
}
