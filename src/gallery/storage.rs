use super::{GalleryEntry, GalleryStore, MemoryGallery, StorageError};
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, StorageError>;

pub fn load_gallery_from_file(path: &Path) -> Result<Vec<GalleryEntry>> {
    let json = std::fs::read_to_string(path)?;
    let entries: Vec<GalleryEntry> = serde_json::from_str(&json)?;
    Ok(entries)
}

/// Gallery persisted as one JSON document, rewritten on every mutation.
///
/// `quota_bytes` caps the document size the way browser storage does; a write
/// over quota fails with `CapacityExceeded` after the in-memory list has
/// already changed.
pub struct JsonFileGallery {
    path: PathBuf,
    memory: MemoryGallery,
    quota_bytes: Option<usize>,
}

impl JsonFileGallery {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>, capacity: usize, quota_bytes: Option<usize>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            load_gallery_from_file(&path)?
        } else {
            Vec::new()
        };
        log::info!(
            "Opened gallery {} with {} screenshot(s)",
            path.display(),
            entries.len()
        );
        Ok(Self {
            path,
            memory: MemoryGallery::from_entries(entries, capacity),
            quota_bytes,
        })
    }

    /// Like `open`, but an unreadable or corrupt document is logged and the
    /// gallery starts empty. The path is kept, so the next write replaces it.
    pub fn open_or_empty(path: impl Into<PathBuf>, capacity: usize, quota_bytes: Option<usize>) -> Self {
        let path = path.into();
        match Self::open(path.clone(), capacity, quota_bytes) {
            Ok(gallery) => gallery,
            Err(err) => {
                log::warn!(
                    "Could not load gallery {}, starting empty: {}",
                    path.display(),
                    err
                );
                Self {
                    path,
                    memory: MemoryGallery::new(capacity),
                    quota_bytes,
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the persisted document, dropping unsaved in-memory entries.
    pub fn reload(&mut self) -> Result<()> {
        let entries = if self.path.exists() {
            load_gallery_from_file(&self.path)?
        } else {
            Vec::new()
        };
        self.memory = MemoryGallery::from_entries(entries, self.memory.capacity());
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(self.memory.entries())?;
        if let Some(quota) = self.quota_bytes {
            if json.len() > quota {
                return Err(StorageError::CapacityExceeded {
                    needed: json.len(),
                    quota,
                });
            }
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl GalleryStore for JsonFileGallery {
    fn put(&mut self, entry: GalleryEntry) -> Result<()> {
        self.memory.push(entry);
        self.persist()
    }

    fn list(&self) -> &[GalleryEntry] {
        self.memory.entries()
    }

    fn delete_by_id(&mut self, id: u64) -> Result<bool> {
        if !self.memory.remove(id) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn clear(&mut self) -> Result<()> {
        self.memory.clear_entries();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
