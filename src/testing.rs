//! Test doubles for the ports.

use crate::assets::{AssetSource, LoadError, LoadEvent, LoadTicket};
use crate::capture::{CaptureError, FrameGrabber, FramePixels};
use crate::gallery::Clock;
use crate::scene::SceneGraph;
use crate::ui::{Notification, NotificationSink, Severity};
use crate::xr::{SessionError, SessionOptions, XrEvent, XrPlatform};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Default)]
struct SourceState {
    requests: Vec<(LoadTicket, String)>,
    ready: VecDeque<LoadEvent>,
}

/// Asset source whose completions are scripted by the test.
pub struct ManualAssetSource {
    state: Rc<RefCell<SourceState>>,
}

#[derive(Clone)]
pub struct AssetSourceHandle {
    state: Rc<RefCell<SourceState>>,
}

impl ManualAssetSource {
    pub fn new() -> (Self, AssetSourceHandle) {
        let state = Rc::new(RefCell::new(SourceState::default()));
        (
            Self {
                state: Rc::clone(&state),
            },
            AssetSourceHandle { state },
        )
    }
}

impl AssetSource for ManualAssetSource {
    fn request(&mut self, ticket: LoadTicket, asset_id: &str) {
        self.state
            .borrow_mut()
            .requests
            .push((ticket, asset_id.to_string()));
    }

    fn poll(&mut self) -> Vec<LoadEvent> {
        self.state.borrow_mut().ready.drain(..).collect()
    }
}

impl AssetSourceHandle {
    pub fn requests(&self) -> Vec<(LoadTicket, String)> {
        self.state.borrow().requests.clone()
    }

    pub fn last_ticket_for(&self, asset_id: &str) -> Option<LoadTicket> {
        self.state
            .borrow()
            .requests
            .iter()
            .rev()
            .find(|(_, id)| id == asset_id)
            .map(|(ticket, _)| *ticket)
    }

    pub fn push(&self, event: LoadEvent) {
        self.state.borrow_mut().ready.push_back(event);
    }

    pub fn progress(&self, ticket: LoadTicket, loaded_bytes: u64, total_bytes: u64) {
        self.push(LoadEvent::Progress {
            ticket,
            loaded_bytes,
            total_bytes,
        });
    }

    pub fn complete_ok(&self, ticket: LoadTicket, asset_id: &str) {
        self.push(LoadEvent::Completed {
            ticket,
            result: Ok(SceneGraph::single_mesh(asset_id, asset_id.as_bytes().to_vec())),
        });
    }

    pub fn complete_err(&self, ticket: LoadTicket, asset_id: &str) {
        self.push(LoadEvent::Completed {
            ticket,
            result: Err(LoadError::Decode {
                asset_id: asset_id.to_string(),
                reason: "truncated glTF".to_string(),
            }),
        });
    }
}

#[derive(Default)]
struct XrState {
    session_requests: Vec<SessionOptions>,
    frame_requests: usize,
    end_requests: usize,
    refusal: Option<SessionError>,
    ready: VecDeque<XrEvent>,
}

/// XR platform that records requests and replays queued events.
pub struct FakeXrPlatform {
    state: Rc<RefCell<XrState>>,
}

#[derive(Clone)]
pub struct XrPlatformHandle {
    state: Rc<RefCell<XrState>>,
}

impl FakeXrPlatform {
    pub fn new() -> (Self, XrPlatformHandle) {
        let state = Rc::new(RefCell::new(XrState::default()));
        (
            Self {
                state: Rc::clone(&state),
            },
            XrPlatformHandle { state },
        )
    }
}

impl XrPlatform for FakeXrPlatform {
    fn request_session(&mut self, options: &SessionOptions) -> Result<(), SessionError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.refusal.clone() {
            return Err(error);
        }
        state.session_requests.push(options.clone());
        Ok(())
    }

    fn request_animation_frame(&mut self) {
        self.state.borrow_mut().frame_requests += 1;
    }

    fn end_session(&mut self) {
        self.state.borrow_mut().end_requests += 1;
    }

    fn poll(&mut self) -> Vec<XrEvent> {
        self.state.borrow_mut().ready.drain(..).collect()
    }
}

impl XrPlatformHandle {
    pub fn push(&self, event: XrEvent) {
        self.state.borrow_mut().ready.push_back(event);
    }

    pub fn refuse_with(&self, error: SessionError) {
        self.state.borrow_mut().refusal = Some(error);
    }

    pub fn session_requests(&self) -> Vec<SessionOptions> {
        self.state.borrow().session_requests.clone()
    }

    pub fn frame_requests(&self) -> usize {
        self.state.borrow().frame_requests
    }

    pub fn end_requests(&self) -> usize {
        self.state.borrow().end_requests
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    seen: Rc<RefCell<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.seen
            .borrow()
            .iter()
            .map(|notification| notification.message.clone())
            .collect()
    }

    pub fn last(&self) -> Option<(String, Severity)> {
        self.seen
            .borrow()
            .last()
            .map(|notification| (notification.message.clone(), notification.severity))
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&mut self, notification: Notification) {
        self.seen.borrow_mut().push(notification);
    }
}

#[derive(Clone, Default)]
pub struct FixedClock {
    now_ms: Rc<Cell<u64>>,
}

impl FixedClock {
    pub fn at(now_ms: u64) -> Self {
        Self {
            now_ms: Rc::new(Cell::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.set(now_ms);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

/// Frame grabber for a camera stream that never started.
pub struct NoCameraFrames;

impl FrameGrabber for NoCameraFrames {
    fn grab_frame(&mut self) -> Result<FramePixels, CaptureError> {
        Err(CaptureError::FrameUnavailable("camera stream not started".to_string()))
    }
}
