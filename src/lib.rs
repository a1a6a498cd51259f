//! arview - model synchronization and AR placement core
//!
//! Keeps an inline orbit preview and an immersive AR session pointed at the
//! same catalog asset and scale, and anchors placed copies of that asset in
//! world space from controller select events.
//!
//! Everything outside the core (DOM/UI widgets, the rendering pipeline, the
//! camera stream, asset decoding) is reached through small port traits so the
//! host can supply real implementations and tests can supply doubles.

pub mod app;
pub mod assets;
pub mod capture;
pub mod config;
pub mod gallery;
pub mod render;
pub mod scene;
pub mod ui;
pub mod xr;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{ModelSelection, ModelStateStore, SelectionChange, SyncBridge, Viewer, ViewerPorts};
pub use assets::{Asset, AssetCatalog, ProductInfo};
pub use config::ViewerConfig;
pub use gallery::{GalleryEntry, GalleryStore};
pub use render::PreviewRendererAdapter;
pub use xr::{ArSessionController, SessionState};
