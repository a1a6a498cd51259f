use crate::scene::{MeshData, SceneGraph};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Content-addressed pool of mesh payloads.
///
/// Every graph that passes through `intern` has its meshes replaced by the
/// pooled copy with the same SHA-256 digest, so reloading an asset that is
/// still referenced by placed copies does not duplicate its payload. The pool
/// holds weak handles; payloads die with their last scene graph.
#[derive(Default)]
pub struct MeshCache {
    entries: HashMap<[u8; 32], Weak<MeshData>>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn intern(&mut self, mut graph: SceneGraph) -> SceneGraph {
        let mut reused = 0usize;
        for node in graph.nodes_mut() {
            let Some(mesh) = node.mesh.take() else {
                continue;
            };
            let digest = mesh_digest(&mesh);
            let pooled = self.entries.get(&digest).and_then(Weak::upgrade);
            node.mesh = Some(match pooled {
                Some(existing) => {
                    reused += 1;
                    existing
                }
                None => {
                    self.entries.insert(digest, Arc::downgrade(&mesh));
                    mesh
                }
            });
        }
        if reused > 0 {
            log::debug!("Reused {} pooled mesh payload(s)", reused);
        }
        graph
    }

    /// Forgets entries whose payload is no longer alive.
    pub fn purge(&mut self) {
        self.entries.retain(|_, weak| weak.strong_count() > 0);
    }

    pub fn live_entries(&self) -> usize {
        self.entries
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

fn mesh_digest(mesh: &MeshData) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(&mesh.payload);
    hasher.finalize().into()
}
