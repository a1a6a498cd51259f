use super::SelectionChange;

/// Consumer of committed selections on the AR side.
pub trait SelectionSink {
    fn apply_selection(&mut self, change: &SelectionChange);
}

/// Forwards selection changes to the AR side once it is connected.
pub struct SyncBridge<S> {
    sink: Option<S>,
}

impl<S> Default for SyncBridge<S> {
    fn default() -> Self {
        Self { sink: None }
    }
}

impl<S: SelectionSink> SyncBridge<S> {
    pub fn new() -> Self {
        Self { sink: None }
    }

    /// Connects the AR side and brings it up to the current selection.
    pub fn connect(&mut self, mut sink: S, current: &SelectionChange) {
        if self.sink.is_some() {
            log::warn!("Replacing connected AR session controller");
        }
        sink.apply_selection(current);
        self.sink = Some(sink);
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    /// Returns false when nothing is connected; the change is dropped and the
    /// next `connect` catches up instead.
    pub fn propagate(&mut self, change: &SelectionChange) -> bool {
        match &mut self.sink {
            Some(sink) => {
                sink.apply_selection(change);
                true
            }
            None => {
                log::debug!(
                    "No AR session controller connected, skipping v{}",
                    change.version
                );
                false
            }
        }
    }

    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    pub fn sink_mut(&mut self) -> Option<&mut S> {
        self.sink.as_mut()
    }
}
