//! Entity identifiers and their allocation.
//!
//! An [`Entity`] is a lightweight, copyable handle: an [`Id`] naming a slot plus a [`Generation`]
//! counting how many times that slot has been handed out. Entities own nothing themselves; the
//! [`Registry`](crate::ecs::Registry) keeps their name, their components and the cached kind sets
//! used for membership tests.
//!
//! # Generation Tracking
//!
//! When an entity is freed its generation is bumped before the id goes back into the pool, so a
//! stale handle can be told apart from the entity that later reuses its slot:
//!
//! ```rust,ignore
//! let entity = allocator.alloc(); // Entity { id: 0, generation: 0 }
//! allocator.free(entity);
//! let reused = allocator.alloc();  // Entity { id: 0, generation: 1 }
//! assert!(!allocator.is_live(entity));
//! ```

mod definition;

use std::fmt;

use fixedbitset::FixedBitSet;

pub use definition::{Definitions, Template};

/// The generation of an entity, used to track whether an entity handle is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u32);

impl Generation {
    /// The first generation of an entity.
    const FIRST: Self = Self(0);

    /// Get the next generation from the current.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// An entity slot identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Id {
    /// Get the raw identifier value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

/// An entity in the ECS, identified by its `id` and `generation`.
///
/// Ordering is by id first, then generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity {
    /// The slot of the entity.
    id: Id,

    /// How many times the slot has been reused.
    generation: Generation,
}

impl Entity {
    /// Construct an entity of the first generation. Primarily used for testing.
    #[inline]
    pub(crate) fn new(id: impl Into<Id>) -> Self {
        Self::new_with_generation(id.into(), Generation::FIRST)
    }

    #[inline]
    pub(crate) const fn new_with_generation(id: Id, generation: Generation) -> Self {
        Self { id, generation }
    }

    /// Get the id of this entity.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the generation of this entity.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Get the index of this entity if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.id.0 as usize
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {}v{}", self.id.0, self.generation.0)
    }
}

/// Hands out entity handles and recycles the ids of freed ones.
///
/// Freed ids are reused last-in first-out. The allocator is owned by a single registry and
/// requires `&mut self`; nothing here is shared across threads.
#[derive(Default, Debug)]
pub struct Allocator {
    /// Current generation of each slot, indexed by id.
    generations: Vec<Generation>,

    /// Slots currently handed out.
    live: FixedBitSet,

    /// Ids available for reuse.
    dead_pool: Vec<Id>,
}

impl Allocator {
    /// Construct an empty allocator starting from id 0.
    #[inline]
    pub const fn new() -> Self {
        Self {
            generations: Vec::new(),
            live: FixedBitSet::new(),
            dead_pool: Vec::new(),
        }
    }

    /// Allocate an entity, reusing a freed id when one is available.
    pub fn alloc(&mut self) -> Entity {
        let entity = match self.dead_pool.pop() {
            Some(id) => Entity::new_with_generation(id, self.generations[id.0 as usize]),
            None => {
                let id = Id(self.generations.len() as u32);
                self.generations.push(Generation::FIRST);
                self.live.grow(self.generations.len());
                Entity::new(id)
            }
        };
        self.live.insert(entity.index());
        entity
    }

    /// Free an entity so its id can be reused. Returns `false` if the handle is not live.
    pub fn free(&mut self, entity: Entity) -> bool {
        if !self.is_live(entity) {
            return false;
        }
        let index = entity.index();
        self.generations[index] = self.generations[index].next();
        self.live.set(index, false);
        self.dead_pool.push(entity.id);
        true
    }

    /// Determine whether the handle refers to a currently allocated entity.
    #[inline]
    pub fn is_live(&self, entity: Entity) -> bool {
        self.live.contains(entity.index())
            && self.generations.get(entity.index()) == Some(&entity.generation)
    }

    /// Number of entities currently allocated.
    #[inline]
    pub fn len(&self) -> usize {
        self.live.count_ones(..)
    }

    /// Returns true if no entity is currently allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
