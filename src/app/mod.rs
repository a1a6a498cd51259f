mod bridge;
mod input;
mod selection;

pub use bridge::{SelectionSink, SyncBridge};
pub use input::{action_for_key, InputAction, Key, Modifiers};
pub use selection::{ModelSelection, ModelStateStore, SelectionChange, SelectionError};

use crate::assets::{AssetCatalog, AssetSource, CatalogError, ProductInfo};
use crate::capture::{capture_png, CaptureError, FrameGrabber};
use crate::config::{BadgeConfig, ConfigError, ViewerConfig};
use crate::gallery::{next_entry_id, Clock, GalleryEntry, GalleryStore, StorageError};
use crate::render::{PreviewEvent, PreviewRendererAdapter};
use crate::ui::{self, Notification, NotificationSink, Severity};
use crate::xr::{ArEvent, ArSessionController, SessionError};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Host-provided collaborators of the viewer.
pub struct ViewerPorts {
    pub preview_source: Box<dyn AssetSource>,
    pub gallery: Box<dyn GalleryStore>,
    pub notifier: Box<dyn NotificationSink>,
    pub frames: Box<dyn FrameGrabber>,
    pub clock: Box<dyn Clock>,
}

/// Viewer controller: routes selection changes to the preview and, through
/// the bridge, to the AR session; owns the screenshot gallery flow.
pub struct Viewer {
    store: ModelStateStore,
    preview: PreviewRendererAdapter,
    bridge: SyncBridge<ArSessionController>,
    gallery: Box<dyn GalleryStore>,
    notifier: Box<dyn NotificationSink>,
    frames: Box<dyn FrameGrabber>,
    clock: Box<dyn Clock>,
    badge: BadgeConfig,
}

impl Viewer {
    /// Builds the viewer on the catalog's default asset and issues the
    /// initial preview load (deferred while the lazy gate is armed).
    pub fn new(config: &ViewerConfig, ports: ViewerPorts) -> Result<Self, ViewerError> {
        config.validate()?;
        let catalog = AssetCatalog::from_config(&config.catalog)?;
        log::info!("Catalog ready with {} asset(s)", catalog.len());
        let store = ModelStateStore::new(catalog, config.scale);
        let mut preview = PreviewRendererAdapter::new(ports.preview_source, config.preview.lazy_load);
        let initial = store.change();
        preview.request_initial(&store.current_asset(), initial.selection.scale, initial.version);
        Ok(Self {
            store,
            preview,
            bridge: SyncBridge::new(),
            gallery: ports.gallery,
            notifier: ports.notifier,
            frames: ports.frames,
            clock: ports.clock,
            badge: config.capture,
        })
    }

    pub fn catalog(&self) -> &AssetCatalog {
        self.store.catalog()
    }

    pub fn selection(&self) -> &ModelSelection {
        self.store.current()
    }

    pub fn version(&self) -> u64 {
        self.store.version()
    }

    pub fn preview(&self) -> &PreviewRendererAdapter {
        &self.preview
    }

    pub fn preview_mut(&mut self) -> &mut PreviewRendererAdapter {
        &mut self.preview
    }

    pub fn ar_session(&self) -> Option<&ArSessionController> {
        self.bridge.sink()
    }

    pub fn ar_session_mut(&mut self) -> Option<&mut ArSessionController> {
        self.bridge.sink_mut()
    }

    /// Explicit model switch. Re-selecting the current asset reloads it,
    /// which is how a failed load is retried.
    pub fn select_model(&mut self, asset_id: &str) -> SelectionChange {
        let change = self.store.select(asset_id);
        self.notify(ui::SWITCHING_MODEL, Severity::Info);
        let asset = self.store.current_asset();
        self.preview
            .load(&asset, change.selection.scale, change.version);
        self.bridge.propagate(&change);
        change
    }

    pub fn set_scale(&mut self, scale: f32) -> Result<Option<SelectionChange>, SelectionError> {
        let Some(change) = self.store.set_scale(scale)? else {
            return Ok(None);
        };
        self.preview.set_scale(change.selection.scale, change.version);
        self.bridge.propagate(&change);
        Ok(Some(change))
    }

    pub fn scale_label(&self) -> String {
        ui::scale_label(self.store.current().scale)
    }

    pub fn product_info(&self) -> ProductInfo {
        self.store.catalog().product_info(&self.store.current().asset_id)
    }

    pub fn thumbnail_svg(&self, asset_id: &str) -> String {
        ui::placeholder_thumbnail_svg(&self.store.catalog().metadata(asset_id).label)
    }

    /// Pointer-down or tap on the preview. Opens the lazy-load gate once.
    pub fn pointer_down(&mut self) -> bool {
        self.preview.on_first_interaction()
    }

    /// Runs shortcuts the core owns and hands every mapped action back.
    pub fn handle_key(&mut self, key: Key, modifiers: Modifiers) -> Option<InputAction> {
        let action = action_for_key(key, modifiers)?;
        if action == InputAction::CaptureScreenshot {
            // failures are already reported by capture_screenshot
            let _ = self.capture_screenshot();
        }
        Some(action)
    }

    /// Connects the AR session controller and brings it to the current
    /// selection.
    pub fn attach_ar_session(&mut self, controller: ArSessionController) {
        log::info!("AR session controller attached");
        self.bridge.connect(controller, &self.store.change());
    }

    pub fn request_ar_session(&mut self) -> Result<(), SessionError> {
        let result = match self.bridge.sink_mut() {
            Some(ar) => ar.request_session(),
            None => Err(SessionError::Unsupported),
        };
        if let Err(err) = &result {
            log::warn!("AR session unavailable: {}", err);
            self.notify(ui::AR_NOT_AVAILABLE, Severity::Error);
        }
        result
    }

    pub fn end_ar_session(&mut self) -> Result<(), SessionError> {
        match self.bridge.sink_mut() {
            Some(ar) => ar.end_session(),
            None => Err(SessionError::Unsupported),
        }
    }

    /// Polls every port once and applies what arrived.
    pub fn pump(&mut self) {
        for event in self.preview.poll() {
            if let PreviewEvent::Failed { .. } = event {
                self.notify(ui::MODEL_LOAD_FAILED, Severity::Error);
            }
        }
        let ar_events = self
            .bridge
            .sink_mut()
            .map(|ar| ar.poll())
            .unwrap_or_default();
        for event in ar_events {
            match event {
                ArEvent::ReferenceFailed { .. } => {
                    self.notify(ui::MODEL_LOAD_FAILED, Severity::Error)
                }
                ArEvent::SessionFailed(_) => self.notify(ui::AR_NOT_AVAILABLE, Severity::Error),
                ArEvent::PlacementRejected(_) => {
                    self.notify(ui::PLACEMENT_LIMIT_REACHED, Severity::Error)
                }
                _ => {}
            }
        }
    }

    /// True once the preview and, when attached, the AR reference model both
    /// reflect the latest selection.
    pub fn is_converged(&self) -> bool {
        let version = Some(self.store.version());
        let preview = self.preview.applied_version() == version;
        let ar = self
            .bridge
            .sink()
            .map_or(true, |ar| ar.applied_version() == version);
        preview && ar
    }

    pub fn screenshots(&self) -> &[GalleryEntry] {
        self.gallery.list()
    }

    /// Captures, watermarks and stores a screenshot. Storage failures are
    /// reported and the entry id is still returned.
    pub fn capture_screenshot(&mut self) -> Result<u64, CaptureError> {
        let image_png = match capture_png(self.frames.as_mut(), &self.badge) {
            Ok(image_png) => image_png,
            Err(err) => {
                log::warn!("Screenshot capture failed: {}", err);
                self.notify(ui::SCREENSHOT_FAILED, Severity::Error);
                return Err(err);
            }
        };
        let now = self.clock.now_ms();
        let id = next_entry_id(now, self.gallery.list());
        let entry = GalleryEntry {
            id,
            image_png,
            date: now,
            source_asset_id: self.store.current().asset_id.clone(),
        };
        match self.gallery.put(entry) {
            Ok(()) => {
                log::info!("Screenshot {} saved", id);
                self.notify(ui::SCREENSHOT_SAVED, Severity::Success);
            }
            Err(err) => self.report_storage(err),
        }
        Ok(id)
    }

    /// Writes one stored screenshot to `dir` as `ar-view-<id>.png`.
    pub fn export_screenshot(&mut self, id: u64, dir: &Path) -> Result<Option<PathBuf>, StorageError> {
        let Some(entry) = self.gallery.list().iter().find(|entry| entry.id == id) else {
            return Ok(None);
        };
        let path = dir.join(format!("ar-view-{}.png", id));
        std::fs::write(&path, &entry.image_png)?;
        self.notify(ui::SCREENSHOT_DOWNLOADED, Severity::Success);
        Ok(Some(path))
    }

    pub fn delete_screenshot(&mut self, id: u64) -> bool {
        match self.gallery.delete_by_id(id) {
            Ok(true) => {
                self.notify(ui::SCREENSHOT_DELETED, Severity::Info);
                true
            }
            Ok(false) => false,
            Err(err) => {
                self.report_storage(err);
                true
            }
        }
    }

    /// Returns false without notifying when the gallery is already empty.
    pub fn clear_gallery(&mut self) -> bool {
        if self.gallery.list().is_empty() {
            return false;
        }
        match self.gallery.clear() {
            Ok(()) => self.notify(ui::GALLERY_CLEARED, Severity::Info),
            Err(err) => self.report_storage(err),
        }
        true
    }

    fn report_storage(&mut self, err: StorageError) {
        log::warn!("Gallery write failed: {}", err);
        self.notify(ui::STORAGE_LIMIT_REACHED, Severity::Error);
    }

    fn notify(&mut self, message: &str, severity: Severity) {
        self.notifier.notify(Notification::new(message, severity));
    }
}
