use std::time::Duration;

/// Derives per-frame deltas from a monotonically increasing elapsed time.
///
/// The first tick reports a zero delta so that animation does not jump by
/// however long startup took. A clock reading earlier than the previous one
/// also yields zero.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<Duration>,
    /// Time since last tick
    pub delta: Duration,
    /// Total number of ticks
    pub frame_count: u64,
    fps_window: Duration,
    fps_frames: u32,
    /// Frames per second over the last full second, 0 until one has passed.
    pub current_fps: f32,
}

impl FrameClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the elapsed time of a new frame and returns the delta in seconds.
    pub fn tick(&mut self, elapsed: Duration) -> f32 {
        self.delta = match self.last {
            Some(last) => elapsed.saturating_sub(last),
            None => Duration::ZERO,
        };
        self.last = Some(self.last.map_or(elapsed, |last| last.max(elapsed)));
        self.frame_count += 1;

        self.fps_frames += 1;
        self.fps_window += self.delta;
        if self.fps_window >= Duration::from_secs(1) {
            self.current_fps = self.fps_frames as f32 / self.fps_window.as_secs_f32();
            self.fps_window = Duration::ZERO;
            self.fps_frames = 0;
        }

        self.delta.as_secs_f32()
    }

    #[must_use]
    pub fn dt_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}
