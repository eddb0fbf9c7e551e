use std::time::{Duration, Instant};

/// Fixed-rate tick schedule for frame delivery and the render loop.
///
/// Deadlines advance by whole frame periods from the previous deadline, so a
/// slow tick does not shift every later tick. When the loop falls more than a
/// frame behind the schedule is reset to `now`.
#[derive(Debug)]
pub struct TickPacing {
    frame_duration: Duration,
    next_deadline: Option<Instant>,
}

impl TickPacing {
    pub fn new(target_fps: f64) -> Self {
        let fps = if target_fps.is_finite() && target_fps > 0.0 {
            target_fps
        } else {
            tracing::warn!(target_fps, "Invalid target fps, falling back to 60");
            60.0
        };

        Self {
            frame_duration: Duration::from_secs_f64(1.0 / fps),
            next_deadline: None,
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// How long to sleep before the next tick, advancing the schedule.
    pub fn time_until_next(&mut self, now: Instant) -> Duration {
        let deadline = match self.next_deadline {
            Some(d) if d + self.frame_duration >= now => d + self.frame_duration,
            _ => now,
        };
        self.next_deadline = Some(deadline);
        deadline.saturating_duration_since(now)
    }

    pub fn wait_next(&mut self) {
        let delay = self.time_until_next(Instant::now());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
