pub mod camera;
mod preview;

pub use camera::{CameraOrbit, OrbitCamera, OrbitParseError, OrbitRadius};
pub use preview::{PreviewEvent, PreviewRendererAdapter, PreviewState};
