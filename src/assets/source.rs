//! Asset source port.
//!
//! Fetching and decoding live outside the core. A component issues
//! `request(ticket, id)` and later receives `LoadEvent`s for that ticket from
//! `poll()`; the ticket is how superseded loads are recognized.

use crate::scene::SceneGraph;
use std::collections::VecDeque;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// Generation number of one load request, unique per requesting component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

#[derive(Debug)]
pub enum LoadEvent {
    Progress {
        ticket: LoadTicket,
        loaded_bytes: u64,
        total_bytes: u64,
    },
    Completed {
        ticket: LoadTicket,
        result: Result<SceneGraph, LoadError>,
    },
}

impl LoadEvent {
    pub fn ticket(&self) -> LoadTicket {
        match self {
            LoadEvent::Progress { ticket, .. } | LoadEvent::Completed { ticket, .. } => *ticket,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read asset at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("asset id {asset_id} does not name a file under the asset root")]
    InvalidId { asset_id: String },
    #[error("failed to decode asset {asset_id}: {reason}")]
    Decode { asset_id: String, reason: String },
}

pub trait AssetSource {
    /// Starts fetching `asset_id`. Never blocks; results arrive via `poll`.
    fn request(&mut self, ticket: LoadTicket, asset_id: &str);

    /// Drains whatever progress/completion events are ready.
    fn poll(&mut self) -> Vec<LoadEvent>;
}

const READ_CHUNK: usize = 64 * 1024;

/// Reads asset files from a directory. Each file becomes a single opaque
/// mesh payload; decoding is left to whatever consumes the payload.
pub struct DirectoryAssetSource {
    root: PathBuf,
    queue: VecDeque<(LoadTicket, String)>,
}

impl DirectoryAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            queue: VecDeque::new(),
        }
    }

    fn resolve(&self, asset_id: &str) -> Result<PathBuf, LoadError> {
        let relative = Path::new(asset_id);
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if asset_id.is_empty() || !plain {
            return Err(LoadError::InvalidId {
                asset_id: asset_id.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }

    fn read(
        &self,
        ticket: LoadTicket,
        asset_id: &str,
        events: &mut Vec<LoadEvent>,
    ) -> Result<SceneGraph, LoadError> {
        let path = self.resolve(asset_id)?;
        let read_error = |source| LoadError::Read {
            path: path.display().to_string(),
            source,
        };
        let mut file = std::fs::File::open(&path).map_err(read_error)?;
        let total_bytes = file.metadata().map_err(read_error)?.len();
        let mut payload = Vec::with_capacity(total_bytes as usize);
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let read = file.read(&mut chunk).map_err(read_error)?;
            if read == 0 {
                break;
            }
            payload.extend_from_slice(&chunk[..read]);
            events.push(LoadEvent::Progress {
                ticket,
                loaded_bytes: payload.len() as u64,
                total_bytes,
            });
        }
        Ok(SceneGraph::single_mesh(asset_id, payload))
    }
}

impl AssetSource for DirectoryAssetSource {
    fn request(&mut self, ticket: LoadTicket, asset_id: &str) {
        self.queue.push_back((ticket, asset_id.to_string()));
    }

    fn poll(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Some((ticket, asset_id)) = self.queue.pop_front() {
            let result = self.read(ticket, &asset_id, &mut events);
            events.push(LoadEvent::Completed { ticket, result });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> PathBuf {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "arview_assets_{}_{}_{}",
            tag,
            std::process::id(),
            nonce
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn reads_file_with_progress_then_completion() {
        let root = temp_root("read");
        let bytes = vec![42u8; READ_CHUNK + 10];
        std::fs::write(root.join("chair.glb"), &bytes).unwrap();

        let mut source = DirectoryAssetSource::new(&root);
        source.request(LoadTicket(1), "chair.glb");
        let events = source.poll();

        let progress: Vec<(u64, u64)> = events
            .iter()
            .filter_map(|event| match event {
                LoadEvent::Progress {
                    loaded_bytes,
                    total_bytes,
                    ..
                } => Some((*loaded_bytes, *total_bytes)),
                _ => None,
            })
            .collect();
        assert_eq!(progress.last(), Some(&(bytes.len() as u64, bytes.len() as u64)));
        assert!(progress.len() >= 2);

        match events.last() {
            Some(LoadEvent::Completed { ticket, result: Ok(graph) }) => {
                assert_eq!(*ticket, LoadTicket(1));
                assert_eq!(graph.nodes()[0].mesh.as_ref().unwrap().payload.len(), bytes.len());
            }
            other => panic!("expected completed load, got {:?}", other),
        }
        assert!(source.poll().is_empty());
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn missing_file_completes_with_read_error() {
        let root = temp_root("missing");
        let mut source = DirectoryAssetSource::new(&root);
        source.request(LoadTicket(4), "sofa.glb");
        let events = source.poll();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            LoadEvent::Completed { result: Err(LoadError::Read { .. }), .. }
        ));
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn ids_escaping_the_root_are_rejected() {
        let mut source = DirectoryAssetSource::new("assets");
        source.request(LoadTicket(1), "../secret.glb");
        source.request(LoadTicket(2), "");
        let events = source.poll();
        assert!(events.iter().all(|event| matches!(
            event,
            LoadEvent::Completed { result: Err(LoadError::InvalidId { .. }), .. }
        )));
        assert_eq!(events.len(), 2);
    }
}
