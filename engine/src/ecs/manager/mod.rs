//! Managers: world-wide observers of entity lifecycle.
//!
//! Unlike systems, managers do not filter. Every manager sees every entity that enters, changes or
//! leaves the registry, once per frame, during `World::begin`.

use std::collections::HashMap;

use log::trace;

use crate::ecs::{
    Registry,
    entity::{self, Entity},
    util::AsAny,
};

pub trait Manager: AsAny {
    /// The entity entered the registry.
    fn on_entity_added(&mut self, _registry: &Registry, _entity: Entity) {}

    /// The entity's component set changed.
    fn on_entity_changed(&mut self, _registry: &Registry, _entity: Entity) {}

    /// The entity left the registry. Its record is already gone.
    fn on_entity_removed(&mut self, _registry: &Registry, _entity: Entity) {}
}

/// Keeps the set of live entities and some lifetime counters.
#[derive(Debug, Default)]
pub struct EntityManager {
    entities: HashMap<entity::Id, Entity>,
    added: u64,
    removed: u64,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live entity currently using `id`.
    pub fn get(&self, id: entity::Id) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    pub fn is_active(&self, entity: Entity) -> bool {
        self.get(entity.id()) == Some(entity)
    }

    /// Number of live entities.
    pub fn active_count(&self) -> usize {
        self.entities.len()
    }

    /// Total number of entities ever added.
    pub fn total_added(&self) -> u64 {
        self.added
    }

    /// Total number of entities ever removed.
    pub fn total_removed(&self) -> u64 {
        self.removed
    }
}

impl Manager for EntityManager {
    fn on_entity_added(&mut self, _registry: &Registry, entity: Entity) {
        self.entities.insert(entity.id(), entity);
        self.added += 1;
        trace!("entity manager: {entity} added ({} active)", self.entities.len());
    }

    fn on_entity_removed(&mut self, _registry: &Registry, entity: Entity) {
        if self.entities.get(&entity.id()) == Some(&entity) {
            self.entities.remove(&entity.id());
        }
        self.removed += 1;
        trace!("entity manager: {entity} removed ({} active)", self.entities.len());
    }
}
