use crate::{core::runner::RunResult, ecs::World};

/// Run exactly one frame with a single processing step, ignoring the clock.
pub fn once(world: &mut World) -> RunResult {
    let result = world.begin();
    if result.is_ok() {
        world.process();
        world.render();
        world.end();
    }
    result.into()
}
