/// Measures wall-clock time between display refresh callbacks
pub struct FrameClock {
    last_frame: chrono::DateTime<chrono::Utc>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_frame: chrono::Utc::now(),
        }
    }

    /// Milliseconds elapsed since the previous tick
    pub fn tick(&mut self) -> f64 {
        self.tick_at(chrono::Utc::now())
    }

    pub fn tick_at(&mut self, now: chrono::DateTime<chrono::Utc>) -> f64 {
        let elapsed = now.signed_duration_since(self.last_frame);
        self.last_frame = now;
        elapsed
            .num_microseconds()
            .map(|microseconds| microseconds as f64 / 1_000.0)
            .unwrap_or(f64::MAX)
    }
}

/// Bounds a frame delta so the integrator never takes a step longer than `max_ms`.
/// Negative deltas, which a wall clock can produce after an adjustment, become zero.
pub fn clamp_step_ms(delta_ms: f64, max_ms: f64) -> f64 {
    delta_ms.min(max_ms).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_TIME_STEP_MS: f64 = 1.0 / 60.0 * 1000.0;

    #[test]
    fn long_frames_are_clamped() {
        assert_eq!(clamp_step_ms(500.0, MAX_TIME_STEP_MS), MAX_TIME_STEP_MS);
        assert_eq!(clamp_step_ms(MAX_TIME_STEP_MS, MAX_TIME_STEP_MS), MAX_TIME_STEP_MS);
    }

    #[test]
    fn short_frames_pass_through() {
        assert_eq!(clamp_step_ms(10.0, MAX_TIME_STEP_MS), 10.0);
        assert_eq!(clamp_step_ms(0.0, MAX_TIME_STEP_MS), 0.0);
    }

    #[test]
    fn negative_frames_become_zero() {
        assert_eq!(clamp_step_ms(-3.0, MAX_TIME_STEP_MS), 0.0);
    }

    #[test]
    fn tick_measures_elapsed_milliseconds() {
        let start = chrono::Utc::now();
        let mut clock = FrameClock { last_frame: start };

        let elapsed = clock.tick_at(start + chrono::Duration::milliseconds(25));
        assert!((elapsed - 25.0).abs() < 1e-9);

        let elapsed = clock.tick_at(start + chrono::Duration::milliseconds(30));
        assert!((elapsed - 5.0).abs() < 1e-9);
    }
}
