//! Screenshot composition: camera frame + watermark badge, encoded as PNG.

use crate::config::BadgeConfig;
use image::{Rgba, RgbaImage};
use std::io::Cursor;

/// Raw RGBA8 readback of the current camera/compositor frame.
#[derive(Debug, Clone)]
pub struct FramePixels {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Source of camera frames for screenshots.
pub trait FrameGrabber {
    fn grab_frame(&mut self) -> Result<FramePixels, CaptureError>;
}

/// Fixed single-color frames, for hosts without a camera stream.
#[derive(Debug, Clone, Copy)]
pub struct SolidFrameGrabber {
    width: u32,
    height: u32,
    rgba: [u8; 4],
}

impl SolidFrameGrabber {
    pub fn new(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            rgba,
        }
    }
}

impl FrameGrabber for SolidFrameGrabber {
    fn grab_frame(&mut self) -> Result<FramePixels, CaptureError> {
        let count = self.width as usize * self.height as usize;
        Ok(FramePixels {
            width: self.width,
            height: self.height,
            pixels: self.rgba.repeat(count),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no camera frame available: {0}")]
    FrameUnavailable(String),
    #[error("frame buffer of {len} bytes does not match {width}x{height} RGBA")]
    FrameSize { width: u32, height: u32, len: usize },
    #[error("failed encoding screenshot PNG: {0}")]
    Encode(#[from] image::ImageError),
}

const ACCENT_WIDTH: u32 = 4;
const CORNER_RADIUS: f32 = 8.0;

/// Grabs one frame, stamps the badge and returns PNG bytes.
pub fn capture_png(grabber: &mut dyn FrameGrabber, badge: &BadgeConfig) -> Result<Vec<u8>, CaptureError> {
    let frame = grabber.grab_frame()?;
    let mut image = frame_to_image(frame)?;
    draw_badge(&mut image, badge);
    encode_png(&image)
}

fn frame_to_image(frame: FramePixels) -> Result<RgbaImage, CaptureError> {
    let FramePixels {
        width,
        height,
        pixels,
    } = frame;
    let len = pixels.len();
    RgbaImage::from_raw(width, height, pixels).ok_or(CaptureError::FrameSize { width, height, len })
}

/// Rounded badge in the bottom-right corner with an accent strip on its left
/// edge. Clipped to the frame.
pub fn draw_badge(image: &mut RgbaImage, badge: &BadgeConfig) {
    let (width, height) = image.dimensions();
    let right = width.saturating_sub(badge.margin_right);
    let bottom = height.saturating_sub(badge.margin_bottom);
    let left = right.saturating_sub(badge.width);
    let top = bottom.saturating_sub(badge.height);
    if left >= right || top >= bottom {
        log::debug!("Frame {}x{} too small for screenshot badge", width, height);
        return;
    }

    for y in top..bottom {
        for x in left..right {
            if !inside_rounded(x - left, y - top, right - left, bottom - top) {
                continue;
            }
            let color = if x - left < ACCENT_WIDTH {
                badge.accent_rgba
            } else {
                badge.fill_rgba
            };
            let pixel = image.get_pixel_mut(x, y);
            *pixel = blend(*pixel, color);
        }
    }
}

fn inside_rounded(x: u32, y: u32, w: u32, h: u32) -> bool {
    let radius = CORNER_RADIUS.min(w as f32 / 2.0).min(h as f32 / 2.0);
    let px = x as f32 + 0.5;
    let py = y as f32 + 0.5;
    let cx = px.clamp(radius, w as f32 - radius);
    let cy = py.clamp(radius, h as f32 - radius);
    (px - cx).powi(2) + (py - cy).powi(2) <= radius * radius
}

fn blend(under: Rgba<u8>, over: [u8; 4]) -> Rgba<u8> {
    let alpha = u32::from(over[3]);
    let inv = 255 - alpha;
    let mix = |o: u8, u: u8| ((u32::from(o) * alpha + u32::from(u) * inv + 127) / 255) as u8;
    Rgba([
        mix(over[0], under[0]),
        mix(over[1], under[1]),
        mix(over[2], under[2]),
        under[3].max(over[3]),
    ])
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}
