use std::time::{Duration, Instant};

pub const SIXTY_FPS: u64 = 16_666_666;
pub const ONE_FPS: u64 = 1_000_000_000;

/// The clock of the frame driver.
///
/// Each frame captures total elapsed time as well as the delta since the previous frame, and
/// accumulates that delta so the runner can consume it in fixed simulation steps. New frames are
/// produced from the previous one with [`next`](Self::next), or [`advance`](Self::advance) when
/// the delta comes from somewhere else than the wall clock.
#[derive(Debug, Copy, Clone)]
pub struct Time {
    // The current instant when this frame was created
    instant: Instant,
    pub fixed_time_step: u64,
    /// The time delta since the last frame
    pub delta: Duration,
    /// The total elapsed time since the first frame
    pub time: Duration,
    /// The total elapsed time since the first frame but incremented by the fixed time step
    pub fixed_time: Duration,
    /// Nanoseconds not yet consumed by fixed steps
    accumulator: u64,
}

impl Time {
    /// Construct a new `Time` with delta and time set to `0`. Caller must provide a fixed time
    /// step in nano seconds.
    pub fn new(fixed_time_step: u64) -> Self {
        Self {
            fixed_time_step,
            instant: Instant::now(),
            delta: Duration::ZERO,
            time: Duration::ZERO,
            fixed_time: Duration::ZERO,
            accumulator: 0,
        }
    }

    /// Consume one fixed step from the accumulator.
    pub fn increment_fixed(&mut self) {
        self.fixed_time += Duration::from_nanos(self.fixed_time_step);
        self.accumulator = self.accumulator.saturating_sub(self.fixed_time_step);
    }

    /// Create the next frame, measuring the delta on the wall clock.
    pub fn next(self) -> Self {
        let delta = self.instant.elapsed();
        self.advance(delta)
    }

    /// Create the next frame with an explicit delta.
    pub fn advance(self, delta: Duration) -> Self {
        Self {
            fixed_time_step: self.fixed_time_step,
            instant: Instant::now(),
            delta,
            time: self.time + delta,
            fixed_time: self.fixed_time,
            accumulator: self
                .accumulator
                .saturating_add(u64::try_from(delta.as_nanos()).unwrap_or(u64::MAX)),
        }
    }

    /// Determine whether this frame has accumulated enough delta for a fixed frame.
    pub fn has_fixed(&self) -> bool {
        self.accumulator >= self.fixed_time_step
    }

    /// Time left until the next fixed step is due.
    pub fn until_fixed(&self) -> Duration {
        Duration::from_nanos(self.fixed_time_step.saturating_sub(self.accumulator))
    }

    /// Forget the accumulated time that has not been consumed. Returns the dropped nanoseconds.
    pub fn drain_accumulator(&mut self) -> u64 {
        std::mem::take(&mut self.accumulator)
    }

    /// Reset the time frame to now with zeroed accumulator. This is useful for situations where
    /// the engine is paused and resumed.
    pub fn reset_now(&mut self) {
        self.instant = Instant::now();
        self.accumulator = 0;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new(SIXTY_FPS)
    }
}
