mod gems;

use std::sync::{Arc, atomic::AtomicBool};

use gem_engine::{
    core::{
        Config,
        log::ChannelLogger,
        runner::{self, RunResult, Runner},
        time::SIXTY_FPS,
    },
    ecs::{EntityManager, World},
};
use log::LevelFilter;

use gems::{Board, Director, Gravity, Spawn};

fn main() {
    let (logger, receiver) = ChannelLogger::with_receiver(LevelFilter::Info);
    log::set_max_level(logger.level());
    if let Err(error) = log::set_boxed_logger(Box::new(logger)) {
        eprintln!("logger already installed: {error}");
    }

    let stop = Arc::new(AtomicBool::new(false));
    let mut world = World::new();
    world.add_system(Director::new(stop.clone()));
    world.add_system(Gravity::default());
    world.add_system(Board::default());
    world.add_manager(EntityManager::new());
    if let Err(error) = world.send_event::<Director, _>(Spawn(10)) {
        eprintln!("{error}");
    }

    let config = Config::default()
        .with_fixed_time_step(SIXTY_FPS / 4)
        .with_frame_limit(2_000);
    let run: Runner = Box::new(move |world: &mut World| runner::looped(world, config, &stop));
    let result = run(&mut world);

    for message in receiver.try_iter() {
        println!("{:>5} {}", message.level, message.message);
    }

    let entities = world.get_manager::<EntityManager>().map(|m| m.active_count()).unwrap_or(0);
    match result {
        RunResult::Success => println!("{} frames, {entities} entities", world.frame()),
        RunResult::Failure(error) => {
            eprintln!("run failed: {error}");
            std::process::exit(1);
        }
    }
}
