//! Frame drivers for a [`World`].
//!
//! [`FixedStep`] turns elapsed time into frames: every frame begins the world, runs `process` once
//! per accumulated fixed step, then renders and ends. [`once`] and [`looped`] are the two ready-made
//! ways of running it.

mod looped;
mod once;

use std::time::Duration;

use log::warn;

use crate::{
    core::{Config, Time},
    ecs::{self, World},
};

#[derive(Debug, PartialEq, Eq)]
pub enum RunResult {
    Success,
    Failure(ecs::Error),
}

impl From<ecs::Result<()>> for RunResult {
    fn from(result: ecs::Result<()>) -> Self {
        match result {
            Ok(()) => RunResult::Success,
            Err(error) => RunResult::Failure(error),
        }
    }
}

/// A boxed way of running a world, chosen by the binary.
pub type Runner = Box<dyn FnOnce(&mut World) -> RunResult>;

pub use looped::looped;
pub use once::once;

/// A fixed time step frame driver.
#[derive(Debug, Clone)]
pub struct FixedStep {
    config: Config,
    time: Time,
}

impl FixedStep {
    pub fn new(config: Config) -> Self {
        Self {
            time: Time::new(config.fixed_time_step),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Run one frame with the wall-clock time elapsed since the previous one. Returns the number
    /// of fixed steps processed.
    pub fn frame(&mut self, world: &mut World) -> ecs::Result<u32> {
        self.time = self.time.next();
        self.run(world)
    }

    /// Run one frame as if `delta` had elapsed since the previous one.
    pub fn advance(&mut self, world: &mut World, delta: Duration) -> ecs::Result<u32> {
        self.time = self.time.advance(delta);
        self.run(world)
    }

    /// Restart the clock, e.g. after a pause, so the paused time is not simulated.
    pub fn reset(&mut self) {
        self.time.reset_now();
    }

    fn run(&mut self, world: &mut World) -> ecs::Result<u32> {
        world.begin()?;

        let mut steps = 0;
        while self.time.has_fixed() && steps < self.config.max_steps_per_frame {
            world.process();
            self.time.increment_fixed();
            steps += 1;
        }
        if self.time.has_fixed() {
            let dropped = self.time.drain_accumulator();
            warn!("frame {} fell behind, dropping {dropped}ns", world.frame());
        }

        world.render();
        world.end();
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::ecs::{Registry, System, entity::Entity};

    #[derive(Default)]
    struct Counter {
        processed: u32,
        rendered: u32,
    }

    impl System for Counter {
        fn process_entities(&mut self, _registry: &mut Registry, _entities: &[Entity]) {
            self.processed += 1;
        }

        fn render(&mut self, _registry: &Registry, _entities: &[Entity]) {
            self.rendered += 1;
        }
    }

    fn world() -> World {
        let mut world = World::new();
        world.add_system(Counter::default());
        world
    }

    #[test]
    fn process_runs_once_per_fixed_step() {
        // Given
        let mut world = world();
        let mut driver = FixedStep::new(Config::default().with_fixed_time_step(10));

        // When
        let first = driver.advance(&mut world, Duration::from_nanos(25)).unwrap();
        let second = driver.advance(&mut world, Duration::from_nanos(5)).unwrap();

        // Then
        assert_eq!((first, second), (2, 1));
        let counter = world.get_system::<Counter>().unwrap();
        assert_eq!(counter.processed, 3);
        assert_eq!(counter.rendered, 2);
        assert_eq!(world.frame(), 2);
    }

    #[test]
    fn slow_frames_are_capped() {
        // Given
        let mut world = world();
        let config = Config::default()
            .with_fixed_time_step(10)
            .with_max_steps_per_frame(3);
        let mut driver = FixedStep::new(config);

        // When
        let steps = driver.advance(&mut world, Duration::from_nanos(1_000)).unwrap();

        // Then
        assert_eq!(steps, 3);
        assert!(!driver.time().has_fixed());
    }

    #[test]
    fn once_runs_a_single_step() {
        // Given
        let mut world = world();

        // When
        let result = once(&mut world);

        // Then
        assert_eq!(result, RunResult::Success);
        assert_eq!(world.get_system::<Counter>().unwrap().processed, 1);
        assert_eq!(world.frame(), 1);
    }

    #[test]
    fn looped_honors_the_frame_limit() {
        // Given
        let mut world = world();
        let stop = AtomicBool::new(false);
        let config = Config::default()
            .with_fixed_time_step(1)
            .with_frame_limit(4);

        // When
        let result = looped(&mut world, config, &stop);

        // Then
        assert_eq!(result, RunResult::Success);
        assert_eq!(world.frame(), 4);
    }

    #[test]
    fn looped_stops_on_request() {
        // Given
        let mut world = world();
        let stop = AtomicBool::new(true);

        // When
        let result = looped(&mut world, Config::default(), &stop);

        // Then
        assert_eq!(result, RunResult::Success);
        assert_eq!(world.frame(), 0);
        assert!(stop.load(Ordering::Relaxed));
    }
}
