//! Presentation helpers that stay host-neutral: the notification sink, the
//! scale label and the placeholder thumbnail for assets without artwork.

pub const SWITCHING_MODEL: &str = "Switching model...";
pub const MODEL_LOAD_FAILED: &str = "Error loading 3D model";
pub const SCREENSHOT_SAVED: &str = "Screenshot saved!";
pub const SCREENSHOT_DOWNLOADED: &str = "Screenshot downloaded!";
pub const STORAGE_LIMIT_REACHED: &str = "Storage limit reached";
pub const SCREENSHOT_DELETED: &str = "Screenshot deleted";
pub const GALLERY_CLEARED: &str = "Gallery cleared";
pub const AR_NOT_AVAILABLE: &str = "AR not available";
pub const PLACEMENT_LIMIT_REACHED: &str = "Placement limit reached";
pub const SCREENSHOT_FAILED: &str = "Screenshot failed";

const THUMBNAIL_FILL: &str = "#0b6efd";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// Fire-and-forget toast channel. Display and dismissal belong to the host.
pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

/// Routes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&mut self, notification: Notification) {
        match notification.severity {
            Severity::Error => log::error!("{}", notification.message),
            Severity::Info | Severity::Success => log::info!("{}", notification.message),
        }
    }
}

pub fn scale_label(scale: f32) -> String {
    format!("{:.2}x", scale)
}

/// Up to two uppercase initials of `label`, one per word.
pub fn initials(label: &str) -> String {
    label
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphanumeric()))
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

/// 120x80 SVG tile with the label's initials, used when no thumbnail image is
/// authored for an asset.
pub fn placeholder_thumbnail_svg(label: &str) -> String {
    let text = initials(label);
    let text = if text.is_empty() { "?".to_string() } else { text };
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="120" height="80" viewBox="0 0 120 80">"#,
            r#"<rect width="120" height="80" rx="8" fill="{}"/>"#,
            r#"<text x="60" y="48" font-family="sans-serif" font-size="28" font-weight="600" "#,
            r##"fill="#ffffff" text-anchor="middle">{}</text></svg>"##
        ),
        THUMBNAIL_FILL, text
    )
}
