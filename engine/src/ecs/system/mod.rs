//! Systems: per-frame logic over the entities matching an [`Aspect`].
//!
//! # Overview
//!
//! A system declares the component kinds it cares about through [`System::aspect`]. The
//! [`World`](crate::ecs::World) keeps, for every registered system, the ordered set of entities
//! currently matching that aspect (the *active* set) and re-evaluates membership at the start of
//! each frame for the entities whose components changed.
//!
//! ```rust,ignore
//! use gem_engine::ecs::{Aspect, Entity, Registry, System};
//!
//! struct Movement;
//!
//! impl System for Movement {
//!     fn aspect(&self, registry: &Registry) -> Aspect {
//!         registry.aspect_for_all::<(Position, Velocity)>()
//!     }
//!
//!     fn process_entities(&mut self, registry: &mut Registry, entities: &[Entity]) {
//!         for &entity in entities {
//!             let Some(&Velocity { dx, dy }) = registry.get::<Velocity>(entity) else { continue };
//!             if let Some(pos) = registry.get_mut::<Position>(entity) {
//!                 pos.x += dx;
//!                 pos.y += dy;
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! # Phases
//!
//! - [`process`](System::process_entities) runs once per fixed step, gated by
//!   [`check_processing`](System::check_processing), wrapped in [`begin`](System::begin) and
//!   [`end`](System::end).
//! - [`render`](System::render) runs once per frame and is never gated.
//!
//! Systems must not expect membership changes to show up mid-frame: attaching, detaching and
//! dropping entities during a phase only takes effect at the next `World::begin`.

use std::any::Any;

use log::trace;

use crate::ecs::{Aspect, Registry, entity::Entity, util::AsAny};

/// A system identifier: the registration slot of the system in its world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this id if it were to live in indexable storage (e.g. Vec, bitset)
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Per-frame logic driven by the world.
///
/// Every hook has an empty default so systems only implement what they need.
pub trait System: AsAny {
    /// The filter deciding which entities this system tracks.
    ///
    /// Called once when the system is added to a world. The default, [`Aspect::empty`], tracks
    /// nothing.
    fn aspect(&self, _registry: &Registry) -> Aspect {
        Aspect::empty()
    }

    /// Whether [`process_entities`](Self::process_entities) should run this step.
    fn check_processing(&self) -> bool {
        true
    }

    fn begin(&mut self, _registry: &mut Registry) {}

    /// Process the active entities, in the order they became active.
    fn process_entities(&mut self, _registry: &mut Registry, _entities: &[Entity]) {}

    fn end(&mut self, _registry: &mut Registry) {}

    /// Presentation pass over the active entities.
    fn render(&mut self, _registry: &Registry, _entities: &[Entity]) {}

    /// The entity started matching the aspect.
    fn inserted(&mut self, _registry: &Registry, _entity: Entity) {}

    /// The entity stopped matching the aspect, or left the registry.
    fn removed(&mut self, _registry: &Registry, _entity: Entity) {}

    /// An event sent to this system through
    /// [`World::send_event`](crate::ecs::World::send_event).
    fn on_event(&mut self, _registry: &mut Registry, _event: &dyn Any) {}
}

/// A system registered with a world, with its aspect and active set.
pub(crate) struct Instance {
    id: Id,
    name: &'static str,
    aspect: Aspect,
    active: Vec<Entity>,
    system: Box<dyn System>,
}

impl Instance {
    pub(crate) fn new(
        id: Id,
        name: &'static str,
        system: Box<dyn System>,
        registry: &Registry,
    ) -> Self {
        let aspect = system.aspect(registry);
        Self {
            id,
            name,
            aspect,
            active: Vec::new(),
            system,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> Id {
        self.id
    }

    #[inline]
    pub(crate) fn aspect(&self) -> &Aspect {
        &self.aspect
    }

    #[inline]
    pub(crate) fn active(&self) -> &[Entity] {
        &self.active
    }

    #[inline]
    pub(crate) fn system(&self) -> &dyn System {
        self.system.as_ref()
    }

    #[inline]
    pub(crate) fn system_mut(&mut self) -> &mut dyn System {
        self.system.as_mut()
    }

    /// Re-evaluate whether the entity belongs to the active set.
    pub(crate) fn check(&mut self, registry: &mut Registry, entity: Entity) {
        let record = registry.record(entity);
        let interested = record.is_some_and(|record| self.aspect.matches(record.kinds()));
        let tracked = match record {
            Some(record) => record.is_tracked_by(self.id),
            None => self.active.contains(&entity),
        };

        if interested && !tracked {
            if let Some(record) = registry.record_mut(entity) {
                record.track(self.id);
            }
            self.active.push(entity);
            trace!("{entity} inserted into {}", self.name);
            self.system.inserted(registry, entity);
        } else if !interested && tracked {
            if let Some(record) = registry.record_mut(entity) {
                record.untrack(self.id);
            }
            self.active.retain(|active| *active != entity);
            trace!("{entity} removed from {}", self.name);
            self.system.removed(registry, entity);
        }
    }

    /// Drop an entity that left the registry from the active set.
    pub(crate) fn forget(&mut self, registry: &mut Registry, entity: Entity) {
        let Some(position) = self.active.iter().position(|active| *active == entity) else {
            return;
        };
        self.active.remove(position);
        if let Some(record) = registry.record_mut(entity) {
            record.untrack(self.id);
        }
        trace!("{entity} forgotten by {}", self.name);
        self.system.removed(registry, entity);
    }

    /// Untag every active entity, ahead of this instance being replaced.
    pub(crate) fn release(&mut self, registry: &mut Registry) {
        for entity in self.active.drain(..) {
            if let Some(record) = registry.record_mut(entity) {
                record.untrack(self.id);
            }
        }
    }

    pub(crate) fn process(&mut self, registry: &mut Registry) {
        if !self.system.check_processing() {
            return;
        }
        self.system.begin(registry);
        self.system.process_entities(registry, &self.active);
        self.system.end(registry);
    }

    pub(crate) fn render(&mut self, registry: &Registry) {
        self.system.render(registry, &self.active);
    }
}
