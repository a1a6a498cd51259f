//! Screenshot gallery: a bounded list of captured images, newest last.

pub mod storage;

pub use storage::{load_gallery_from_file, JsonFileGallery};

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryEntry {
    /// Capture timestamp in unix milliseconds, unique within a gallery.
    pub id: u64,
    pub image_png: Vec<u8>,
    /// Unix milliseconds.
    pub date: u64,
    pub source_asset_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("gallery needs {needed} bytes but the storage quota is {quota}")]
    CapacityExceeded { needed: usize, quota: usize },
}

/// Persistence port for captured screenshots.
///
/// Stores keep at most `capacity` entries and drop the oldest inserted entry
/// on overflow. A failed write leaves the in-memory list as it was after the
/// mutation; nothing is rolled back.
pub trait GalleryStore {
    fn put(&mut self, entry: GalleryEntry) -> Result<(), StorageError>;

    /// Entries in insertion order, oldest first.
    fn list(&self) -> &[GalleryEntry];

    /// Returns whether an entry was removed.
    fn delete_by_id(&mut self, id: u64) -> Result<bool, StorageError>;

    fn clear(&mut self) -> Result<(), StorageError>;
}

/// Id for a capture taken at `now_ms`: the timestamp itself, bumped past the
/// newest stored id so insertion and id order always agree.
pub fn next_entry_id(now_ms: u64, entries: &[GalleryEntry]) -> u64 {
    match entries.last() {
        Some(last) if now_ms <= last.id => last.id + 1,
        _ => now_ms,
    }
}

/// View helper for gallery grids.
pub fn newest_first(entries: &[GalleryEntry]) -> impl Iterator<Item = &GalleryEntry> {
    entries.iter().rev()
}

pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// In-memory bounded gallery; also the working set of `JsonFileGallery`.
#[derive(Debug, Clone)]
pub struct MemoryGallery {
    entries: Vec<GalleryEntry>,
    capacity: usize,
}

impl MemoryGallery {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn from_entries(mut entries: Vec<GalleryEntry>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        if entries.len() > capacity {
            entries.drain(..entries.len() - capacity);
        }
        Self { entries, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends and returns how many of the oldest entries were evicted.
    pub fn push(&mut self, entry: GalleryEntry) -> usize {
        self.entries.push(entry);
        let overflow = self.entries.len().saturating_sub(self.capacity);
        if overflow > 0 {
            self.entries.drain(..overflow);
            log::debug!("Gallery full, evicted {} oldest screenshot(s)", overflow);
        }
        overflow
    }

    pub fn remove(&mut self, id: u64) -> bool {
        match self.entries.iter().position(|entry| entry.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn clear_entries(&mut self) {
        self.entries.clear();
    }
}

impl GalleryStore for MemoryGallery {
    fn put(&mut self, entry: GalleryEntry) -> Result<(), StorageError> {
        self.push(entry);
        Ok(())
    }

    fn list(&self) -> &[GalleryEntry] {
        &self.entries
    }

    fn delete_by_id(&mut self, id: u64) -> Result<bool, StorageError> {
        Ok(self.remove(id))
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.clear_entries();
        Ok(())
    }
}
