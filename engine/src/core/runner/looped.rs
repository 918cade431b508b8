use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use log::debug;

use crate::{
    core::{
        Config,
        runner::{FixedStep, RunResult},
    },
    ecs::World,
};

/// Run frames until `stop` is raised or the configured frame limit is reached.
///
/// Sleeps whenever a frame had no fixed step to process.
pub fn looped(world: &mut World, config: Config, stop: &AtomicBool) -> RunResult {
    let mut driver = FixedStep::new(config);
    let mut frames = 0;

    loop {
        if stop.load(Ordering::Relaxed) {
            debug!("stop requested after {frames} frame(s)");
            return RunResult::Success;
        }
        if config.frame_limit.is_some_and(|limit| frames >= limit) {
            debug!("frame limit of {frames} reached");
            return RunResult::Success;
        }

        match driver.frame(world) {
            Ok(0) => thread::sleep(driver.time().until_fixed()),
            Ok(_) => {}
            Err(error) => return RunResult::Failure(error),
        }
        frames += 1;
    }
}
