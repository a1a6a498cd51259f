use std::time::Duration;

/// Frame cadence of the AR render callback, driven by the display's own
/// frame timestamps rather than a timer.
pub struct FrameTiming {
    last_frame_time: Option<Duration>,
    last_fps_time: Option<Duration>,
    frame_count: u32,
    frame_total: u64,
    pub frame_dt: f32,
    fps: f32,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTiming {
    pub fn new() -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: None,
            frame_count: 0,
            frame_total: 0,
            frame_dt: 1.0 / 60.0,
            fps: 0.0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frames(&self) -> u64 {
        self.frame_total
    }

    pub fn update(&mut self, now: Duration) {
        let dt_duration = match self.last_frame_time {
            Some(last) => now.saturating_sub(last),
            None => Duration::from_millis(16),
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt_duration.as_secs_f32().max(0.0);
        self.frame_total = self.frame_total.saturating_add(1);

        let Some(fps_start) = self.last_fps_time else {
            self.last_fps_time = Some(now);
            return;
        };
        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_sub(fps_start);
        if elapsed.as_secs_f32() >= 0.5 {
            self.fps = self.frame_count as f32 / elapsed.as_secs_f32();
            log::debug!(
                "AR frame cadence {:.1} fps ({:.2} ms)",
                self.fps,
                self.frame_dt * 1000.0
            );
            self.frame_count = 0;
            self.last_fps_time = Some(now);
        }
    }
}
