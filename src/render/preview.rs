//! Inline preview renderer adapter.
//!
//! Drives a single-model orbit display through `Unloaded -> Loading ->
//! {Loaded | Errored}`. Loads are tagged with a ticket; a completion for a
//! ticket other than the newest is discarded.

use super::camera::{CameraOrbit, OrbitCamera};
use crate::assets::{Asset, AssetSource, LoadError, LoadEvent, LoadTicket};
use crate::scene::{SceneGraph, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Unloaded,
    Loading,
    Loaded,
    Errored,
}

#[derive(Debug)]
pub enum PreviewEvent {
    Progress { asset_id: String, percent: u8 },
    Loaded { asset_id: String },
    Failed { asset_id: String, error: LoadError },
}

struct PendingLoad {
    ticket: LoadTicket,
    asset: Asset,
}

struct DisplayedModel {
    asset_id: String,
    graph: SceneGraph,
}

enum LoadGate {
    Armed { deferred: Option<Asset> },
    Open,
}

pub struct PreviewRendererAdapter {
    source: Box<dyn AssetSource>,
    state: PreviewState,
    gate: LoadGate,
    next_ticket: u64,
    pending: Option<PendingLoad>,
    displayed: Option<DisplayedModel>,
    scale: f32,
    progress: u8,
    camera: OrbitCamera,
    requested_version: Option<u64>,
    applied_version: Option<u64>,
}

impl PreviewRendererAdapter {
    /// `lazy_load` arms the one-time gate: the initial model is only fetched
    /// on the first pointer interaction.
    pub fn new(source: Box<dyn AssetSource>, lazy_load: bool) -> Self {
        Self {
            source,
            state: PreviewState::Unloaded,
            gate: if lazy_load {
                LoadGate::Armed { deferred: None }
            } else {
                LoadGate::Open
            },
            next_ticket: 1,
            pending: None,
            displayed: None,
            scale: 1.0,
            progress: 0,
            camera: OrbitCamera::default(),
            requested_version: None,
            applied_version: None,
        }
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    /// Percent of the current load fetched so far.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn displayed_asset(&self) -> Option<&str> {
        self.displayed.as_ref().map(|model| model.asset_id.as_str())
    }

    pub fn displayed_graph(&self) -> Option<&SceneGraph> {
        self.displayed.as_ref().map(|model| &model.graph)
    }

    pub fn loading_asset(&self) -> Option<&str> {
        self.pending.as_ref().map(|pending| pending.asset.id.as_str())
    }

    pub fn is_gated(&self) -> bool {
        matches!(self.gate, LoadGate::Armed { .. })
    }

    /// Selection version the display currently reflects.
    pub fn applied_version(&self) -> Option<u64> {
        self.applied_version
    }

    pub fn display_transform(&self) -> Transform {
        Transform::IDENTITY.with_uniform_scale(self.scale)
    }

    /// Initial model for first paint. Deferred while the gate is armed.
    pub fn request_initial(&mut self, asset: &Asset, scale: f32, version: u64) {
        self.scale = scale;
        self.requested_version = Some(version);
        match &mut self.gate {
            LoadGate::Armed { deferred } => {
                log::debug!("Preview load of {} deferred until first interaction", asset.id);
                *deferred = Some(asset.clone());
            }
            LoadGate::Open => self.start_load(asset),
        }
    }

    /// Opens the gate on the first pointer-down/tap. Returns true when this
    /// call started the deferred initial load.
    pub fn on_first_interaction(&mut self) -> bool {
        let LoadGate::Armed { deferred } = std::mem::replace(&mut self.gate, LoadGate::Open) else {
            return false;
        };
        match deferred {
            Some(asset) => {
                log::info!("First interaction, loading {}", asset.id);
                self.start_load(&asset);
                true
            }
            None => false,
        }
    }

    /// Switches the display to `asset`. Explicit switches bypass and open the
    /// lazy gate.
    pub fn load(&mut self, asset: &Asset, scale: f32, version: u64) {
        self.gate = LoadGate::Open;
        self.scale = scale;
        self.requested_version = Some(version);
        self.start_load(asset);
    }

    /// Constant-time scale update; load state is untouched.
    pub fn set_scale(&mut self, scale: f32, version: u64) {
        self.scale = scale;
        self.requested_version = Some(version);
        if self.pending.is_none() && self.state == PreviewState::Loaded {
            self.applied_version = Some(version);
        }
    }

    fn start_load(&mut self, asset: &Asset) {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        if let Some(previous) = &self.pending {
            log::debug!(
                "Preview load of {} superseded by {}",
                previous.asset.id,
                asset.id
            );
        }
        self.pending = Some(PendingLoad {
            ticket,
            asset: asset.clone(),
        });
        self.state = PreviewState::Loading;
        self.progress = 0;
        self.source.request(ticket, &asset.id);
    }

    /// Applies whatever the asset source has ready.
    pub fn poll(&mut self) -> Vec<PreviewEvent> {
        let mut events = Vec::new();
        for event in self.source.poll() {
            let ticket = event.ticket();
            let current = self
                .pending
                .as_ref()
                .is_some_and(|pending| pending.ticket == ticket);
            if !current {
                log::debug!("Discarding stale preview load event for ticket {:?}", ticket);
                continue;
            }
            match event {
                LoadEvent::Progress {
                    loaded_bytes,
                    total_bytes,
                    ..
                } => {
                    if let Some(percent) = progress_percent(loaded_bytes, total_bytes) {
                        self.progress = percent;
                        if let Some(pending) = &self.pending {
                            events.push(PreviewEvent::Progress {
                                asset_id: pending.asset.id.clone(),
                                percent,
                            });
                        }
                    }
                }
                LoadEvent::Completed { result, .. } => {
                    let Some(pending) = self.pending.take() else {
                        continue;
                    };
                    events.push(self.finish_load(pending, result));
                }
            }
        }
        events
    }

    fn finish_load(
        &mut self,
        pending: PendingLoad,
        result: Result<SceneGraph, LoadError>,
    ) -> PreviewEvent {
        let asset_id = pending.asset.id.clone();
        match result {
            Ok(graph) => {
                self.frame_camera(&pending.asset, &graph);
                self.displayed = Some(DisplayedModel {
                    asset_id: asset_id.clone(),
                    graph,
                });
                self.state = PreviewState::Loaded;
                self.progress = 100;
                self.applied_version = self.requested_version;
                log::info!("Preview loaded {}", asset_id);
                PreviewEvent::Loaded { asset_id }
            }
            Err(error) => {
                self.state = PreviewState::Errored;
                log::warn!("Preview failed to load {}: {}", asset_id, error);
                PreviewEvent::Failed { asset_id, error }
            }
        }
    }

    fn frame_camera(&mut self, asset: &Asset, graph: &SceneGraph) {
        let bounds = graph.bounds();
        let orbit = asset
            .camera_orbit
            .as_deref()
            .and_then(|value| match value.parse::<CameraOrbit>() {
                Ok(orbit) => Some(orbit),
                Err(err) => {
                    log::warn!("Ignoring camera orbit of {}: {}", asset.id, err);
                    None
                }
            });
        match (orbit, bounds) {
            (Some(orbit), _) => self.camera.apply_orbit(orbit, bounds),
            (None, Some(bounds)) => self.camera = OrbitCamera::from_bounds(bounds),
            (None, None) => self.camera = OrbitCamera::default(),
        }
    }
}

fn progress_percent(loaded_bytes: u64, total_bytes: u64) -> Option<u8> {
    if total_bytes == 0 {
        return None;
    }
    let percent = u128::from(loaded_bytes.min(total_bytes)) * 100 / u128::from(total_bytes);
    Some(percent as u8)
}
