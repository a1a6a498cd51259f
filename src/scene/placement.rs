//! Placed copies of the reference model inside an AR session.
//!
//! A placed instance is a record of (source asset, world transform) plus a
//! shared handle to the template scene graph it was cloned from. Node
//! transforms and mesh payloads are never duplicated per placement.

use super::{SceneGraph, Transform};
use glam::{Mat4, Quat, Vec3};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlacementId(pub u64);

#[derive(Debug, Clone)]
pub struct PlacedInstance {
    pub id: PlacementId,
    pub source_asset_id: String,
    pub transform: Transform,
    pub template: Arc<SceneGraph>,
}

impl PlacedInstance {
    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    pub fn orientation(&self) -> Quat {
        self.transform.rotation
    }

    /// World matrix of every node of the template under this placement.
    pub fn node_world_matrices(&self) -> Vec<Mat4> {
        let root = self.transform.matrix();
        self.template
            .world_matrices()
            .into_iter()
            .map(|local| root * local)
            .collect()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("placement limit of {limit} instances reached")]
    LimitReached { limit: usize },
}

/// World transform of a new copy: the local `offset` is carried through the
/// controller pose, orientation is the controller's own.
///
/// Returns `None` for a pose that cannot be normalized (non-finite values or a
/// zero-length orientation).
pub fn placement_transform(
    controller_position: Vec3,
    controller_orientation: Quat,
    offset: Vec3,
    scale: f32,
) -> Option<Transform> {
    if !controller_position.is_finite()
        || !controller_orientation.is_finite()
        || controller_orientation.length_squared() < f32::EPSILON
    {
        return None;
    }
    let rotation = controller_orientation.normalize();
    Some(Transform {
        translation: controller_position + rotation * offset,
        rotation,
        scale: Vec3::splat(scale),
    })
}

/// Append-only registry of placed instances for one session.
#[derive(Debug, Default)]
pub struct PlacementRegistry {
    instances: Vec<PlacedInstance>,
    next_id: u64,
    limit: Option<usize>,
}

impl PlacementRegistry {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            instances: Vec::new(),
            next_id: 1,
            limit,
        }
    }

    pub fn place(
        &mut self,
        source_asset_id: &str,
        transform: Transform,
        template: Arc<SceneGraph>,
    ) -> Result<PlacementId, PlacementError> {
        if let Some(limit) = self.limit {
            if self.instances.len() >= limit {
                return Err(PlacementError::LimitReached { limit });
            }
        }
        let id = PlacementId(self.next_id);
        self.next_id += 1;
        self.instances.push(PlacedInstance {
            id,
            source_asset_id: source_asset_id.to_string(),
            transform,
            template,
        });
        Ok(id)
    }

    pub fn instances(&self) -> &[PlacedInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Drops every placement; ids keep counting up.
    pub fn reset(&mut self) {
        self.instances.clear();
    }
}
