//! Immersive AR session controller.
//!
//! Owns the session lifecycle `Idle -> SessionRequested -> SessionActive ->
//! SessionEnded -> Idle`, the reference model placed copies are cloned from,
//! and the per-session registry of placed instances.

mod timing;

pub use timing::FrameTiming;

use crate::app::{SelectionChange, SelectionSink};
use crate::assets::{AssetSource, LoadError, LoadEvent, LoadTicket, MeshCache};
use crate::config::ArConfig;
use crate::scene::{
    placement_transform, MeshData, PlacedInstance, PlacementError, PlacementId,
    PlacementRegistry, SceneGraph,
};
use glam::{Mat4, Quat, Vec3};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    SessionRequested,
    SessionActive,
    SessionEnded,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("immersive AR is not supported on this device")]
    Unsupported,
    #[error("required session feature '{feature}' is unavailable")]
    FeatureUnavailable { feature: String },
    #[error("AR session request was denied")]
    Denied,
    #[error("cannot {action} while session is {state:?}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },
    #[error("AR platform error: {0}")]
    Platform(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub required_features: Vec<String>,
}

/// World pose of the input controller at the moment of a select.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerPose {
    pub position: Vec3,
    pub orientation: Quat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Display timestamp of the frame.
    pub time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XrEvent {
    SessionStarted,
    SessionFailed(SessionError),
    SessionEnded,
    Frame(FrameInfo),
    Select(ControllerPose),
}

/// Platform side of the immersive session (WebXR or a native runtime).
pub trait XrPlatform {
    /// Begins session negotiation. An immediate error means the request could
    /// not even be issued; later outcomes arrive as events.
    fn request_session(&mut self, options: &SessionOptions) -> Result<(), SessionError>;

    /// Schedules one frame callback on the next display refresh.
    fn request_animation_frame(&mut self);

    fn end_session(&mut self);

    fn poll(&mut self) -> Vec<XrEvent>;
}

#[derive(Debug)]
pub enum ArEvent {
    SessionStarted,
    SessionFailed(SessionError),
    SessionEnded,
    ReferenceLoaded { asset_id: String },
    ReferenceFailed { asset_id: String, error: LoadError },
    Placed { id: PlacementId },
    PlacementRejected(PlacementError),
}

/// Outcome of `load_reference_model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceLoad {
    Fetching(LoadTicket),
    /// Same asset already held: only the scale changed.
    Rescaled,
}

#[derive(Debug, Clone)]
pub struct ReferenceModel {
    pub asset_id: String,
    pub scale: f32,
    pub template: Arc<SceneGraph>,
}

struct PendingReference {
    ticket: LoadTicket,
    asset_id: String,
    scale: f32,
    version: u64,
}

/// One mesh to draw this frame.
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub placement: PlacementId,
    pub mesh: Arc<MeshData>,
    pub world: Mat4,
}

pub struct ArSessionController {
    platform: Box<dyn XrPlatform>,
    source: Box<dyn AssetSource>,
    cache: MeshCache,
    options: SessionOptions,
    offset: Vec3,
    state: SessionState,
    next_ticket: u64,
    pending: Option<PendingReference>,
    reference: Option<ReferenceModel>,
    placements: PlacementRegistry,
    timing: FrameTiming,
    draw_list: Vec<DrawItem>,
    applied_version: Option<u64>,
}

impl ArSessionController {
    pub fn new(
        platform: Box<dyn XrPlatform>,
        source: Box<dyn AssetSource>,
        config: &ArConfig,
    ) -> Self {
        Self {
            platform,
            source,
            cache: MeshCache::new(),
            options: SessionOptions {
                required_features: config.required_features.clone(),
            },
            offset: Vec3::from(config.placement_offset),
            state: SessionState::Idle,
            next_ticket: 1,
            pending: None,
            reference: None,
            placements: PlacementRegistry::new(config.max_placed_instances),
            timing: FrameTiming::new(),
            draw_list: Vec::new(),
            applied_version: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn reference(&self) -> Option<&ReferenceModel> {
        self.reference.as_ref()
    }

    pub fn loading_asset(&self) -> Option<&str> {
        self.pending.as_ref().map(|pending| pending.asset_id.as_str())
    }

    pub fn placements(&self) -> &[PlacedInstance] {
        self.placements.instances()
    }

    pub fn draw_list(&self) -> &[DrawItem] {
        &self.draw_list
    }

    pub fn timing(&self) -> &FrameTiming {
        &self.timing
    }

    /// Selection version the reference model currently reflects.
    pub fn applied_version(&self) -> Option<u64> {
        self.applied_version
    }

    pub fn request_session(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => {}
            SessionState::SessionEnded => self.state = SessionState::Idle,
            state => {
                return Err(SessionError::InvalidState {
                    action: "request a session",
                    state,
                })
            }
        }
        self.platform.request_session(&self.options)?;
        self.state = SessionState::SessionRequested;
        log::info!(
            "AR session requested (features: {})",
            self.options.required_features.join(", ")
        );
        Ok(())
    }

    pub fn end_session(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::SessionActive {
            return Err(SessionError::InvalidState {
                action: "end the session",
                state: self.state,
            });
        }
        self.platform.end_session();
        Ok(())
    }

    /// Fetches `asset_id` as the new reference model. The previous model stays
    /// usable until the fetch succeeds; a newer call supersedes this one.
    pub fn load_reference_model(&mut self, asset_id: &str, scale: f32, version: u64) -> ReferenceLoad {
        if self.pending.is_none() {
            if let Some(reference) = self
                .reference
                .as_mut()
                .filter(|reference| reference.asset_id == asset_id)
            {
                reference.scale = scale;
                self.applied_version = Some(version);
                log::debug!("AR reference {} rescaled to {:.2}", asset_id, scale);
                return ReferenceLoad::Rescaled;
            }
        }

        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        if let Some(previous) = &self.pending {
            log::debug!(
                "AR reference load of {} superseded by {}",
                previous.asset_id,
                asset_id
            );
        }
        self.pending = Some(PendingReference {
            ticket,
            asset_id: asset_id.to_string(),
            scale,
            version,
        });
        self.source.request(ticket, asset_id);
        ReferenceLoad::Fetching(ticket)
    }

    /// Clones the reference model at the controller pose. No-op without a
    /// reference model or outside an active session.
    pub fn handle_select(
        &mut self,
        pose: ControllerPose,
    ) -> Result<Option<PlacementId>, PlacementError> {
        if self.state != SessionState::SessionActive {
            log::debug!("Ignoring select outside an active session");
            return Ok(None);
        }
        let Some(reference) = &self.reference else {
            log::debug!("Ignoring select: no reference model loaded");
            return Ok(None);
        };
        let Some(transform) =
            placement_transform(pose.position, pose.orientation, self.offset, reference.scale)
        else {
            log::debug!("Ignoring select with degenerate controller pose {:?}", pose);
            return Ok(None);
        };
        let id = self.placements.place(
            &reference.asset_id,
            transform,
            Arc::clone(&reference.template),
        )?;
        log::info!(
            "Placed {} at ({:.2}, {:.2}, {:.2})",
            reference.asset_id,
            transform.translation.x,
            transform.translation.y,
            transform.translation.z
        );
        Ok(Some(id))
    }

    /// Per-frame render callback: rebuilds the draw list from the current
    /// placements and schedules the next frame.
    pub fn on_frame(&mut self, frame: FrameInfo) {
        if self.state != SessionState::SessionActive {
            return;
        }
        self.timing.update(frame.time);
        self.draw_list.clear();
        for instance in self.placements.instances() {
            let worlds = instance.node_world_matrices();
            for (node, world) in instance.template.nodes().iter().zip(worlds) {
                if let Some(mesh) = &node.mesh {
                    self.draw_list.push(DrawItem {
                        placement: instance.id,
                        mesh: Arc::clone(mesh),
                        world,
                    });
                }
            }
        }
        self.platform.request_animation_frame();
    }

    /// Applies pending platform and asset events. A session seen ending on
    /// the previous poll settles back to `Idle` here.
    pub fn poll(&mut self) -> Vec<ArEvent> {
        if self.state == SessionState::SessionEnded {
            self.state = SessionState::Idle;
            log::debug!("AR session controller idle");
        }
        let mut events = Vec::new();
        for event in self.source.poll() {
            if let Some(outcome) = self.apply_load_event(event) {
                events.push(outcome);
            }
        }
        for event in self.platform.poll() {
            if let Some(outcome) = self.apply_platform_event(event) {
                events.push(outcome);
            }
        }
        events
    }

    fn apply_load_event(&mut self, event: LoadEvent) -> Option<ArEvent> {
        let LoadEvent::Completed { ticket, result } = event else {
            return None;
        };
        let is_current = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.ticket == ticket);
        if !is_current {
            log::debug!("Discarding stale AR reference load for ticket {:?}", ticket);
            return None;
        }
        let pending = self.pending.take()?;
        match result {
            Ok(graph) => {
                let template = Arc::new(self.cache.intern(graph));
                self.cache.purge();
                log::info!(
                    "AR reference model {} loaded at scale {:.2}",
                    pending.asset_id,
                    pending.scale
                );
                self.reference = Some(ReferenceModel {
                    asset_id: pending.asset_id.clone(),
                    scale: pending.scale,
                    template,
                });
                self.applied_version = Some(pending.version);
                Some(ArEvent::ReferenceLoaded {
                    asset_id: pending.asset_id,
                })
            }
            Err(error) => {
                log::warn!(
                    "AR reference load of {} failed, keeping previous model: {}",
                    pending.asset_id,
                    error
                );
                Some(ArEvent::ReferenceFailed {
                    asset_id: pending.asset_id,
                    error,
                })
            }
        }
    }

    fn apply_platform_event(&mut self, event: XrEvent) -> Option<ArEvent> {
        match event {
            XrEvent::SessionStarted => {
                if self.state != SessionState::SessionRequested {
                    log::warn!("Unexpected session start while {:?}", self.state);
                    return None;
                }
                self.state = SessionState::SessionActive;
                self.placements.reset();
                self.timing.reset();
                self.draw_list.clear();
                self.platform.request_animation_frame();
                log::info!("AR session active");
                Some(ArEvent::SessionStarted)
            }
            XrEvent::SessionFailed(error) => {
                if self.state != SessionState::SessionRequested {
                    return None;
                }
                self.state = SessionState::Idle;
                log::warn!("AR session request failed: {}", error);
                Some(ArEvent::SessionFailed(error))
            }
            XrEvent::SessionEnded => {
                if self.state != SessionState::SessionActive {
                    return None;
                }
                self.state = SessionState::SessionEnded;
                self.draw_list.clear();
                log::info!(
                    "AR session ended with {} placed instance(s)",
                    self.placements.len()
                );
                Some(ArEvent::SessionEnded)
            }
            XrEvent::Frame(frame) => {
                self.on_frame(frame);
                None
            }
            XrEvent::Select(pose) => match self.handle_select(pose) {
                Ok(Some(id)) => Some(ArEvent::Placed { id }),
                Ok(None) => None,
                Err(err) => {
                    log::warn!("Placement rejected: {}", err);
                    Some(ArEvent::PlacementRejected(err))
                }
            },
        }
    }
}

impl SelectionSink for ArSessionController {
    fn apply_selection(&mut self, change: &SelectionChange) {
        self.load_reference_model(
            &change.selection.asset_id,
            change.selection.scale,
            change.version,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeXrPlatform, ManualAssetSource};

    fn controller() -> (
        ArSessionController,
        crate::testing::AssetSourceHandle,
        crate::testing::XrPlatformHandle,
    ) {
        let (source, assets) = ManualAssetSource::new();
        let (platform, xr) = FakeXrPlatform::new();
        let controller =
            ArSessionController::new(Box::new(platform), Box::new(source), &ArConfig::default());
        (controller, assets, xr)
    }

    fn active(
        controller: &mut ArSessionController,
        xr: &crate::testing::XrPlatformHandle,
    ) {
        controller.request_session().unwrap();
        xr.push(XrEvent::SessionStarted);
        controller.poll();
        assert_eq!(controller.state(), SessionState::SessionActive);
    }

    fn pose(x: f32, yaw_deg: f32) -> ControllerPose {
        ControllerPose {
            position: Vec3::new(x, 1.6, 0.0),
            orientation: Quat::from_rotation_y(yaw_deg.to_radians()),
        }
    }

    #[test]
    fn session_lifecycle_round_trips_to_idle() {
        let (mut controller, _assets, xr) = controller();
        assert_eq!(controller.state(), SessionState::Idle);
        controller.request_session().unwrap();
        assert_eq!(controller.state(), SessionState::SessionRequested);
        assert_eq!(xr.session_requests()[0].required_features, vec!["hit-test".to_string()]);

        xr.push(XrEvent::SessionStarted);
        controller.poll();
        assert_eq!(controller.state(), SessionState::SessionActive);
        assert_eq!(xr.frame_requests(), 1);

        controller.end_session().unwrap();
        assert_eq!(xr.end_requests(), 1);
        xr.push(XrEvent::SessionEnded);
        controller.poll();
        assert_eq!(controller.state(), SessionState::SessionEnded);
        controller.poll();
        assert_eq!(controller.state(), SessionState::Idle);

        controller.request_session().unwrap();
        assert_eq!(controller.state(), SessionState::SessionRequested);
    }

    #[test]
    fn new_session_may_be_requested_right_after_end() {
        let (mut controller, _assets, xr) = controller();
        controller.request_session().unwrap();
        xr.push(XrEvent::SessionStarted);
        controller.poll();
        xr.push(XrEvent::SessionEnded);
        controller.poll();
        assert_eq!(controller.state(), SessionState::SessionEnded);
        controller.request_session().unwrap();
        assert_eq!(controller.state(), SessionState::SessionRequested);
        assert_eq!(xr.session_requests().len(), 2);
    }

    #[test]
    fn unsupported_platform_keeps_idle() {
        let (mut controller, _assets, xr) = controller();
        xr.refuse_with(SessionError::Unsupported);
        assert_eq!(controller.request_session(), Err(SessionError::Unsupported));
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn denied_request_returns_to_idle() {
        let (mut controller, _assets, xr) = controller();
        controller.request_session().unwrap();
        xr.push(XrEvent::SessionFailed(SessionError::Denied));
        let events = controller.poll();
        assert!(matches!(events[0], ArEvent::SessionFailed(SessionError::Denied)));
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn double_request_is_rejected() {
        let (mut controller, _assets, _xr) = controller();
        controller.request_session().unwrap();
        assert!(matches!(
            controller.request_session(),
            Err(SessionError::InvalidState { .. })
        ));
    }

    #[test]
    fn select_without_reference_is_noop() {
        let (mut controller, _assets, xr) = controller();
        active(&mut controller, &xr);
        xr.push(XrEvent::Select(pose(0.0, 0.0)));
        let events = controller.poll();
        assert!(events.is_empty());
        assert!(controller.placements().is_empty());
    }

    #[test]
    fn three_selects_place_three_copies_at_offset_poses() {
        let (mut controller, assets, xr) = controller();
        controller.load_reference_model("chair.glb", 1.0, 1);
        assets.complete_ok(assets.last_ticket_for("chair.glb").unwrap(), "chair.glb");
        controller.poll();
        active(&mut controller, &xr);

        let poses = [pose(0.0, 0.0), pose(1.0, 90.0), pose(-2.0, 180.0)];
        for p in poses {
            xr.push(XrEvent::Select(p));
        }
        let events = controller.poll();
        assert_eq!(events.len(), 3);
        assert_eq!(controller.placements().len(), 3);

        for (placed, p) in controller.placements().iter().zip(poses) {
            let expected = p.position + p.orientation * Vec3::NEG_Z;
            assert!((placed.position() - expected).length() < 1e-5);
            assert!(placed.orientation().angle_between(p.orientation) < 1e-5);
            assert_eq!(placed.source_asset_id, "chair.glb");
        }
        // yaw 90: forward (-Z) turns into -X
        let second = controller.placements()[1].position();
        assert!((second - Vec3::new(0.0, 1.6, 0.0)).length() < 1e-5);
    }

    #[test]
    fn placements_share_one_template() {
        let (mut controller, assets, xr) = controller();
        controller.load_reference_model("chair.glb", 1.0, 1);
        assets.complete_ok(assets.last_ticket_for("chair.glb").unwrap(), "chair.glb");
        controller.poll();
        active(&mut controller, &xr);
        xr.push(XrEvent::Select(pose(0.0, 0.0)));
        xr.push(XrEvent::Select(pose(1.0, 0.0)));
        controller.poll();
        let placed = controller.placements();
        assert!(Arc::ptr_eq(&placed[0].template, &placed[1].template));
    }

    #[test]
    fn reference_scale_applies_uniformly_to_copies() {
        let (mut controller, assets, xr) = controller();
        controller.load_reference_model("sofa.glb", 0.85, 1);
        assets.complete_ok(assets.last_ticket_for("sofa.glb").unwrap(), "sofa.glb");
        controller.poll();
        active(&mut controller, &xr);
        controller.handle_select(pose(0.0, 0.0)).unwrap();
        assert_eq!(controller.placements()[0].transform.scale, Vec3::splat(0.85));
    }

    #[test]
    fn failed_load_keeps_previous_reference() {
        let (mut controller, assets, xr) = controller();
        controller.load_reference_model("chair.glb", 1.0, 1);
        assets.complete_ok(assets.last_ticket_for("chair.glb").unwrap(), "chair.glb");
        controller.poll();

        controller.load_reference_model("broken.glb", 1.0, 2);
        assets.complete_err(assets.last_ticket_for("broken.glb").unwrap(), "broken.glb");
        let events = controller.poll();
        assert!(matches!(events[0], ArEvent::ReferenceFailed { .. }));
        assert_eq!(controller.reference().unwrap().asset_id, "chair.glb");
        assert_eq!(controller.applied_version(), Some(1));

        active(&mut controller, &xr);
        assert!(controller.handle_select(pose(0.0, 0.0)).unwrap().is_some());
    }

    #[test]
    fn stale_reference_completion_is_discarded() {
        let (mut controller, assets, _xr) = controller();
        controller.load_reference_model("chair.glb", 1.0, 1);
        let chair = assets.last_ticket_for("chair.glb").unwrap();
        controller.load_reference_model("sofa.glb", 0.9, 2);
        let sofa = assets.last_ticket_for("sofa.glb").unwrap();

        assets.complete_ok(sofa, "sofa.glb");
        assets.complete_ok(chair, "chair.glb");
        controller.poll();
        let reference = controller.reference().unwrap();
        assert_eq!(reference.asset_id, "sofa.glb");
        assert_eq!(reference.scale, 0.9);
        assert_eq!(controller.applied_version(), Some(2));
    }

    #[test]
    fn same_asset_rescales_without_fetch() {
        let (mut controller, assets, _xr) = controller();
        controller.load_reference_model("chair.glb", 1.0, 1);
        assets.complete_ok(assets.last_ticket_for("chair.glb").unwrap(), "chair.glb");
        controller.poll();

        let outcome = controller.load_reference_model("chair.glb", 2.0, 2);
        assert_eq!(outcome, ReferenceLoad::Rescaled);
        assert_eq!(assets.requests().len(), 1);
        assert_eq!(controller.reference().unwrap().scale, 2.0);
        assert_eq!(controller.applied_version(), Some(2));
    }

    #[test]
    fn frames_render_placements_and_reschedule() {
        let (mut controller, assets, xr) = controller();
        controller.load_reference_model("chair.glb", 1.0, 1);
        assets.complete_ok(assets.last_ticket_for("chair.glb").unwrap(), "chair.glb");
        controller.poll();
        active(&mut controller, &xr);
        controller.handle_select(pose(0.0, 0.0)).unwrap();

        xr.push(XrEvent::Frame(FrameInfo {
            time: Duration::from_millis(16),
        }));
        controller.poll();
        assert_eq!(controller.draw_list().len(), 1);
        let origin = controller.draw_list()[0].world.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 1.6, -1.0)).length() < 1e-5);
        // one from session start, one from the frame callback
        assert_eq!(xr.frame_requests(), 2);
        assert_eq!(controller.timing().frames(), 1);
    }

    #[test]
    fn degenerate_controller_pose_places_nothing() {
        let (mut controller, assets, xr) = controller();
        controller.load_reference_model("chair.glb", 1.0, 1);
        assets.complete_ok(assets.last_ticket_for("chair.glb").unwrap(), "chair.glb");
        controller.poll();
        active(&mut controller, &xr);

        let degenerate = ControllerPose {
            position: Vec3::new(0.0, 1.6, 0.0),
            orientation: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        };
        assert_eq!(controller.handle_select(degenerate), Ok(None));
        xr.push(XrEvent::Select(degenerate));
        assert!(controller.poll().is_empty());
        assert!(controller.placements().is_empty());
    }

    #[test]
    fn placement_count_never_decreases_and_resets_per_session() {
        let (mut controller, assets, xr) = controller();
        controller.load_reference_model("chair.glb", 1.0, 1);
        assets.complete_ok(assets.last_ticket_for("chair.glb").unwrap(), "chair.glb");
        controller.poll();
        active(&mut controller, &xr);

        let mut previous = 0;
        for i in 0..5 {
            xr.push(XrEvent::Select(pose(i as f32, 0.0)));
            controller.poll();
            assert!(controller.placements().len() > previous);
            previous = controller.placements().len();
        }
        controller.load_reference_model("sofa.glb", 1.0, 2);
        assert_eq!(controller.placements().len(), 5);

        controller.end_session().unwrap();
        xr.push(XrEvent::SessionEnded);
        controller.poll();
        assert_eq!(controller.placements().len(), 5);

        active(&mut controller, &xr);
        assert!(controller.placements().is_empty());
    }

    #[test]
    fn placement_limit_is_reported() {
        let (source, assets) = ManualAssetSource::new();
        let (platform, xr) = FakeXrPlatform::new();
        let config = ArConfig {
            max_placed_instances: Some(1),
            ..ArConfig::default()
        };
        let mut controller =
            ArSessionController::new(Box::new(platform), Box::new(source), &config);
        controller.load_reference_model("chair.glb", 1.0, 1);
        assets.complete_ok(assets.last_ticket_for("chair.glb").unwrap(), "chair.glb");
        controller.poll();
        active(&mut controller, &xr);
        xr.push(XrEvent::Select(pose(0.0, 0.0)));
        xr.push(XrEvent::Select(pose(1.0, 0.0)));
        let events = controller.poll();
        assert!(matches!(events[1], ArEvent::PlacementRejected(PlacementError::LimitReached { limit: 1 })));
        assert_eq!(controller.placements().len(), 1);
    }
}
