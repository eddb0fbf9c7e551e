use std::time::Duration;

pub const UPDATE_INTERVAL: Duration = Duration::from_secs(2);

/// Rendering frame time and rate, averaged over fixed windows.
#[derive(Debug, Clone)]
pub struct FrameRateMeter {
    interval: Duration,
    frames: u32,
    elapsed: Duration,
    frame_time_ms: f64,
    fps: f64,
}

impl Default for FrameRateMeter {
    fn default() -> Self {
        Self::new(UPDATE_INTERVAL)
    }
}

impl FrameRateMeter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            frames: 0,
            elapsed: Duration::ZERO,
            frame_time_ms: 0.0,
            fps: 0.0,
        }
    }

    /// Count one rendered frame that took `delta`. Returns true when the
    /// window closed and the averages were refreshed.
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.frames += 1;
        self.elapsed += delta;

        if self.elapsed <= self.interval {
            return false;
        }

        self.frame_time_ms = 1000.0 * self.elapsed.as_secs_f64() / self.frames as f64;
        self.fps = if self.frame_time_ms > 0.0 {
            1000.0 / self.frame_time_ms
        } else {
            0.0
        };
        self.frames = 0;
        self.elapsed = Duration::ZERO;
        true
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.frame_time_ms
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_reading_before_window_closes() {
        let mut meter = FrameRateMeter::default();
        for _ in 0..40 {
            assert!(!meter.tick(Duration::from_millis(50)));
        }
        assert_eq!(meter.fps(), 0.0);
    }

    #[test]
    fn test_window_average() {
        let mut meter = FrameRateMeter::default();

        let updates = (0..41)
            .filter(|_| meter.tick(Duration::from_millis(50)))
            .count();

        // 41 frames over 2.05 s
        assert_eq!(updates, 1);
        assert!((meter.frame_time_ms() - 50.0).abs() < 1e-9);
        assert!((meter.fps() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_resets_after_update() {
        let mut meter = FrameRateMeter::new(Duration::from_millis(100));

        for _ in 0..11 {
            meter.tick(Duration::from_millis(10));
        }
        assert!((meter.fps() - 100.0).abs() < 1e-6);

        // Slower frames in the next window
        let mut updated = false;
        for _ in 0..6 {
            updated |= meter.tick(Duration::from_millis(20));
        }
        assert!(updated);
        assert!((meter.frame_time_ms() - 20.0).abs() < 1e-6);
    }
}
