pub mod placement;

pub use placement::{
    placement_transform, PlacedInstance, PlacementError, PlacementId, PlacementRegistry,
};

use glam::{Mat4, Quat, Vec3};
use std::sync::Arc;

/// Translation, orientation and scale of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation_rotation(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::ONE,
        }
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Axis-aligned bounds as center plus half extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub center: Vec3,
    pub extent: Vec3,
}

impl Bounds {
    pub fn radius(&self) -> f32 {
        self.extent.max_element()
    }
}

/// Immutable geometry/material payload. The core treats the bytes as opaque;
/// copies of a model share one payload through `Arc`.
#[derive(Debug, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub payload: Vec<u8>,
}

impl MeshData {
    pub fn new(name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<usize>,
    pub local: Transform,
    pub mesh: Option<Arc<MeshData>>,
}

/// Flat node list; parents always precede their children.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    bounds: Option<Bounds>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            bounds: None,
        }
    }

    /// Single root node carrying one opaque mesh payload.
    pub fn single_mesh(name: &str, payload: Vec<u8>) -> Self {
        let mut graph = Self::new();
        graph.push_node(SceneNode {
            name: name.to_string(),
            parent: None,
            local: Transform::IDENTITY,
            mesh: Some(Arc::new(MeshData::new(name, payload))),
        });
        graph
    }

    /// Appends a node and returns its index. A parent index that does not
    /// precede the node is dropped and the node becomes a root.
    pub fn push_node(&mut self, mut node: SceneNode) -> usize {
        let index = self.nodes.len();
        if node.parent.is_some_and(|parent| parent >= index) {
            log::warn!("Scene node '{}' references a later parent; made root", node.name);
            node.parent = None;
        }
        self.nodes.push(node);
        index
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [SceneNode] {
        &mut self.nodes
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.mesh.is_some()).count()
    }

    /// Model-space matrix of every node.
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut worlds: Vec<Mat4> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let local = node.local.matrix();
            let world = match node.parent {
                Some(parent) => worlds[parent] * local,
                None => local,
            };
            worlds.push(world);
        }
        worlds
    }
}
