// src/time.rs
use instant::Instant;
use std::time::Duration;

const FPS_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Per-frame timing for the render loop.
///
/// The simulation itself advances by fixed per-frame increments, so the
/// measured delta is diagnostic only (FPS reporting); it never feeds back
/// into node physics.
#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    frame_count: u64,
    fps_window_start: Instant,
    fps_window_frames: u32,
    fps: u32,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            frame_count: 0,
            fps_window_start: now,
            fps_window_frames: 0,
            fps: 0,
        }
    }

    /// Call once per rendered frame. Returns the wall-clock delta in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;
        self.fps_window_frames += 1;

        let window = now - self.fps_window_start;
        if window >= FPS_UPDATE_INTERVAL {
            self.fps =
                (self.fps_window_frames as f32 / window.as_secs_f32()).round() as u32;
            self.fps_window_frames = 0;
            self.fps_window_start = now;
        }

        delta
    }

    /// Total frames since the clock was created.
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second over the last completed one-second window.
    pub fn fps(&self) -> u32 {
        self.fps
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn tick_counts_frames() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);
        clock.tick();
        clock.tick();
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn tick_reports_positive_delta() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(5));
        let delta = clock.tick();
        assert!(delta > 0.0);
    }

    #[test]
    fn fps_updates_after_a_full_window() {
        let mut clock = FrameClock::new();
        clock.tick();
        assert_eq!(clock.fps(), 0);

        thread::sleep(FPS_UPDATE_INTERVAL + Duration::from_millis(50));
        clock.tick();
        assert!(clock.fps() >= 1);
    }
}
