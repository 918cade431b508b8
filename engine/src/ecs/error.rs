//! Errors raised when an ECS invariant would be violated.
//!
//! Routine misses (a duplicate component kind, a stale removal, an absent component) are not
//! errors: those operations report `false` or `None` instead.

use std::fmt;

use crate::ecs::{component, entity::Entity};

/// Invariant violations surfaced by the registry and the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A component's owner was reassigned while its previous owner still lists it.
    OwnershipConflict {
        component: component::Handle,
        previous_owner: Entity,
    },

    /// No system or manager of the requested type is registered with the world.
    NotFound { name: &'static str },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OwnershipConflict {
                component,
                previous_owner,
            } => write!(
                f,
                "component {component} is still attached to {previous_owner} and must be synchronized first"
            ),
            Error::NotFound { name } => write!(f, "no instance of `{name}` is registered"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for fallible ECS operations.
pub type Result<T> = std::result::Result<T, Error>;
