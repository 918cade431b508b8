//! Engine plumbing around the ECS: configuration, the frame clock, the frame runner and logging.

pub mod config;
pub mod log;
pub mod runner;
pub mod time;

pub use config::Config;
pub use runner::{FixedStep, RunResult};
pub use time::Time;
