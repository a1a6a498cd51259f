/// Host-neutral key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    CaptureScreenshot,
    ToggleFullscreen,
    OpenGallery,
    OpenInfo,
    ExitFullscreen,
}

pub fn action_for_key(key: Key, modifiers: Modifiers) -> Option<InputAction> {
    let command = modifiers.ctrl || modifiers.meta;
    match key {
        Key::Escape => Some(InputAction::ExitFullscreen),
        Key::Char(c) => match (c.to_ascii_lowercase(), command) {
            ('s', true) => Some(InputAction::CaptureScreenshot),
            (_, true) => None,
            ('f', false) => Some(InputAction::ToggleFullscreen),
            ('g', false) => Some(InputAction::OpenGallery),
            ('i', false) => Some(InputAction::OpenInfo),
            _ => None,
        },
    }
}
