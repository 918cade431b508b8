//! A small, frame-stepped entity-component-system runtime.
//!
//! The crate is split in three parts:
//!
//! - [`ecs`]: the entity registry, component ownership protocol, aspects, systems, managers and
//!   the [`World`](ecs::World) that drives them one frame at a time.
//! - [`hsm`]: a hierarchical state machine used by gameplay components and systems.
//! - [`core`]: ambient engine plumbing (frame clock, runner, configuration and logging).

// Allow the derive macros to refer to `::gem_engine` from inside this crate.
extern crate self as gem_engine;

pub mod core;
pub mod ecs;
pub mod hsm;
