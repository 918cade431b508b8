use crate::core::time::SIXTY_FPS;

/// Frame driver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Length of one simulation step in nanoseconds.
    pub fixed_time_step: u64,

    /// Maximum number of simulation steps run in a single frame. Accumulated time beyond this is
    /// dropped so a slow frame cannot snowball into ever slower frames.
    pub max_steps_per_frame: u32,

    /// Stop the looped runner after this many frames.
    pub frame_limit: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fixed_time_step: SIXTY_FPS,
            max_steps_per_frame: 5,
            frame_limit: None,
        }
    }
}

impl Config {
    pub fn with_fixed_time_step(mut self, nanos: u64) -> Self {
        self.fixed_time_step = nanos.max(1);
        self
    }

    pub fn with_max_steps_per_frame(mut self, steps: u32) -> Self {
        self.max_steps_per_frame = steps.max(1);
        self
    }

    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }
}
