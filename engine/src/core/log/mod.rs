//! Logging sinks for the `log` facade.
//!
//! The engine itself only uses the `log` macros. Binaries pick a sink and install it, for instance:
//!
//! ```ignore
//! let (logger, receiver) = ChannelLogger::with_receiver(LevelFilter::Debug);
//! log::set_max_level(logger.level());
//! log::set_boxed_logger(Box::new(logger))?;
//! ```

mod channel;

pub use channel::{ChannelLogger, LogMessage};
