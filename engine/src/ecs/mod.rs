pub mod aspect;
pub mod component;
pub mod entity;
pub mod error;
pub mod manager;
pub mod registry;
pub mod system;
pub(crate) mod util;
pub mod world;

pub use aspect::Aspect;
pub use component::Component;
pub use entity::Entity;
pub use error::{Error, Result};
pub use manager::{EntityManager, Manager};
pub use registry::Registry;
pub use system::System;
pub use world::World;
