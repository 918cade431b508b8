//! Component types, kinds, handles and the ownership protocol.
//!
//! Components are the data containers attached to entities. Each concrete component type is
//! identified at runtime by a [`Kind`], handed out by the [`Kinds`] table the first time the type
//! is seen. Component instances live in the [`Registry`](crate::ecs::Registry) and are addressed
//! by a generational [`Handle`].
//!
//! ## Ownership
//!
//! A component is owned by at most one entity. Its [`Ownership`] records the current and the
//! previous owner and is only changed by the registry's `add`/`remove` operations:
//!
//! ```ignore
//! use gem_engine::ecs::{Component, Registry};
//!
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! let mut registry = Registry::new();
//! let entity = registry.create("player");
//! let handle = registry.insert(Position { x: 0.0, y: 0.0 });
//! assert!(registry.add(entity, handle)?);
//! assert_eq!(registry.owner(handle), Some(entity));
//! ```

mod kinds;
mod set;

use std::fmt;

pub use kinds::Kinds;
pub use set::KindSet;

use crate::ecs::{Error, Result, entity::Entity, util::AsAny};

/// A component kind. This is a unique identifier for a registered component type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Kind(u32);

impl Kind {
    /// Construct a new component kind from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this kind if it were to live in indexable storage (e.g. Vec, bitset)
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Kind {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<usize> for Kind {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

/// A handle to a component instance stored in a registry.
///
/// The generation changes whenever the slot is reused, so handles to destroyed components never
/// resolve to a newer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Get the slot index of this handle.
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    #[inline]
    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// A change of ownership delivered to [`Component::on_attached`] and [`Component::on_detached`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    /// The new owner, `None` when the component was detached.
    pub owner: Option<Entity>,

    /// The owner before this change.
    pub previous_owner: Option<Entity>,
}

/// A trait representing a component in the ECS.
///
/// Usually derived with `#[derive(Component)]`. Implement it by hand to react to attach and detach
/// transitions.
pub trait Component: AsAny {
    /// Called after the component has been attached to `change.owner`.
    fn on_attached(&mut self, _change: &Change) {}

    /// Called after the component has been detached from `change.previous_owner`.
    fn on_detached(&mut self, _change: &Change) {}
}

/// The owner bookkeeping of a single component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    /// The component this ownership belongs to.
    component: Handle,

    /// The entity the component is currently attached to.
    owner: Option<Entity>,

    /// The entity the component was attached to before the last change.
    previous_owner: Option<Entity>,
}

impl Ownership {
    /// A detached component that has never been owned.
    #[inline]
    pub const fn new(component: Handle) -> Self {
        Self {
            component,
            owner: None,
            previous_owner: None,
        }
    }

    #[inline]
    pub fn owner(&self) -> Option<Entity> {
        self.owner
    }

    #[inline]
    pub fn previous_owner(&self) -> Option<Entity> {
        self.previous_owner
    }

    /// Assign a new owner (`None` to detach) in a single step.
    ///
    /// `still_listed` reports whether an entity's registry record still lists this component. If
    /// the previous owner still does, the component has not been synchronized and the assignment
    /// fails with [`Error::OwnershipConflict`] without changing anything.
    ///
    /// Returns the resulting [`Change`], or `None` if `owner` already is the current owner.
    pub fn assign(
        &mut self,
        owner: Option<Entity>,
        still_listed: impl FnOnce(Entity) -> bool,
    ) -> Result<Option<Change>> {
        if let Some(previous_owner) = self.previous_owner
            && still_listed(previous_owner)
        {
            return Err(Error::OwnershipConflict {
                component: self.component,
                previous_owner,
            });
        }

        if self.owner == owner {
            return Ok(None);
        }

        self.previous_owner = self.owner;
        self.owner = owner;

        Ok(Some(Change {
            owner: self.owner,
            previous_owner: self.previous_owner,
        }))
    }
}
