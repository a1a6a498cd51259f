//! arview - headless demo
//!
//! Drives one full viewer session without a display: picks a model, opens a
//! simulated immersive session, places a few copies, switches model and
//! captures a screenshot into the gallery file.
//!
//! Usage: `arview [config.json]`

use arview::app::{Key, Modifiers};
use arview::capture::SolidFrameGrabber;
use arview::config::{load_config_from_file, ViewerConfig};
use arview::gallery::{JsonFileGallery, SystemClock};
use arview::ui::LogNotifier;
use arview::xr::{
    ArSessionController, ControllerPose, FrameInfo, SessionError, SessionOptions, XrEvent,
    XrPlatform,
};
use arview::{assets::DirectoryAssetSource, Viewer, ViewerPorts};
use glam::{Quat, Vec3};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);
const SESSION_FRAMES: u32 = 90;

/// Stands in for a headset: grants every session, ticks frames at 60 Hz and
/// fires a select every 30 frames while turning in place.
struct SimulatedHeadset {
    events: VecDeque<XrEvent>,
    frames: u32,
    active: bool,
}

impl SimulatedHeadset {
    fn new() -> Self {
        Self {
            events: VecDeque::new(),
            frames: 0,
            active: false,
        }
    }
}

impl XrPlatform for SimulatedHeadset {
    fn request_session(&mut self, options: &SessionOptions) -> Result<(), SessionError> {
        log::info!("Headset granting features: {:?}", options.required_features);
        self.active = true;
        self.frames = 0;
        self.events.push_back(XrEvent::SessionStarted);
        Ok(())
    }

    fn request_animation_frame(&mut self) {
        if !self.active {
            return;
        }
        self.frames += 1;
        if self.frames % 30 == 0 {
            let yaw = (self.frames / 30) as f32 * 45f32.to_radians();
            self.events.push_back(XrEvent::Select(ControllerPose {
                position: Vec3::new(0.0, 1.4, 0.0),
                orientation: Quat::from_rotation_y(yaw),
            }));
        }
        if self.frames > SESSION_FRAMES {
            self.end_session();
            return;
        }
        self.events.push_back(XrEvent::Frame(FrameInfo {
            time: FRAME_INTERVAL * self.frames,
        }));
    }

    fn end_session(&mut self) {
        if self.active {
            self.active = false;
            self.events.push_back(XrEvent::SessionEnded);
        }
    }

    fn poll(&mut self) -> Vec<XrEvent> {
        self.events.drain(..).collect()
    }
}

fn load_config() -> Result<ViewerConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {}", path);
            Ok(load_config_from_file(Path::new(&path))?)
        }
        None => Ok(ViewerConfig::default()),
    }
}

fn pump_until_idle(viewer: &mut Viewer, max_rounds: usize) {
    for _ in 0..max_rounds {
        viewer.pump();
        let in_session = viewer
            .ar_session()
            .is_some_and(|ar| ar.state() == arview::SessionState::SessionActive);
        if viewer.is_converged() && !in_session {
            break;
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let gallery = JsonFileGallery::open_or_empty(
        &config.gallery.storage_path,
        config.gallery.capacity,
        config.gallery.quota_bytes,
    );
    let mut viewer = Viewer::new(
        &config,
        ViewerPorts {
            preview_source: Box::new(DirectoryAssetSource::new(&config.asset_root)),
            gallery: Box::new(gallery),
            notifier: Box::new(LogNotifier),
            frames: Box::new(SolidFrameGrabber::new(1280, 720, [40, 44, 52, 255])),
            clock: Box::new(SystemClock),
        },
    )?;
    viewer.attach_ar_session(ArSessionController::new(
        Box::new(SimulatedHeadset::new()),
        Box::new(DirectoryAssetSource::new(&config.asset_root)),
        &config.ar,
    ));

    for asset in viewer.catalog().list() {
        log::info!("  {} ({}, {:.2}x)", asset.id, asset.label, asset.default_scale);
    }

    viewer.pointer_down();
    pump_until_idle(&mut viewer, 4);

    if viewer.request_ar_session().is_ok() {
        pump_until_idle(&mut viewer, 256);
        if let Some(ar) = viewer.ar_session() {
            log::info!(
                "Session placed {} cop(ies) at {:.1} fps",
                ar.placements().len(),
                ar.timing().fps()
            );
        }
    }

    let next = viewer
        .catalog()
        .list()
        .map(|asset| asset.id)
        .find(|id| *id != viewer.selection().asset_id);
    if let Some(next) = next {
        viewer.select_model(&next);
    }
    viewer.set_scale(viewer.selection().scale * 1.25)?;
    pump_until_idle(&mut viewer, 4);
    log::info!(
        "Showing {} at {} (converged: {})",
        viewer.product_info().name,
        viewer.scale_label(),
        viewer.is_converged()
    );

    let ctrl = Modifiers {
        ctrl: true,
        ..Modifiers::default()
    };
    viewer.handle_key(Key::Char('s'), ctrl);
    log::info!("Gallery holds {} screenshot(s)", viewer.screenshots().len());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("arview headless demo");
    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
