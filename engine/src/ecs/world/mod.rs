//! The World ties the registry, the systems and the managers together and drives the frame.
//!
//! A `World` owns its [`Registry`] and hands it to systems and managers as their context. Systems
//! and managers are keyed by their concrete type: a world holds at most one of each.
//!
//! # Frame phases
//!
//! 1. [`begin`](World::begin): flush everything that happened since the last frame. Entities that
//!    entered the registry are checked by every system and announced to every manager, then
//!    entities whose components changed, then entities that left.
//! 2. [`process`](World::process): run every system's per-entity logic, in registration order.
//! 3. [`render`](World::render): run every system's presentation pass.
//! 4. [`end`](World::end): end-of-frame bookkeeping.
//!
//! Membership of the active sets only changes during `begin`, so systems can attach, detach and
//! drop freely while processing without invalidating anyone's iteration.
//!
//! # Example
//!
//! ```ignore
//! use gem_engine::ecs::World;
//!
//! let mut world = World::new();
//! world.add_system(Movement);
//!
//! let entity = world.registry_mut().create("player");
//! world.registry_mut().attach(entity, Position { x: 0.0, y: 0.0 })?;
//! world.registry_mut().attach(entity, Velocity { dx: 1.0, dy: 0.0 })?;
//!
//! world.begin()?;
//! world.process();
//! world.render();
//! world.end();
//! ```

use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    marker::PhantomData,
    mem,
};

use log::{debug, trace};

use crate::ecs::{
    Aspect, Error, Manager, Registry, Result, System,
    entity::Entity,
    registry::Lifecycle,
    system::{self, Instance},
    util::AsAny,
};

/// The central container of the ECS.
pub struct World {
    /// Entities, components and their records.
    registry: Registry,

    /// Systems in registration order.
    systems: Vec<Instance>,

    /// System type → index into `systems`.
    system_types: HashMap<TypeId, usize>,

    /// Managers in registration order.
    managers: Vec<Box<dyn Manager>>,

    /// Manager type → index into `managers`.
    manager_types: HashMap<TypeId, usize>,

    /// Entities to announce at the next `begin`.
    added: Vec<Entity>,

    /// Entities to forget at the next `begin`.
    removed: Vec<Entity>,

    /// Entities to despawn at the next `begin`.
    dropping: Vec<Entity>,

    /// Systems that have not seen the existing entities yet.
    unscanned: Vec<usize>,

    /// Number of completed frames.
    frame: u64,

    /// Marker to make World !Send. World must stay on the main thread.
    _not_send: PhantomData<*mut ()>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Create a world around an existing registry.
    ///
    /// Entities already in the registry are announced at the first `begin`.
    pub fn with_registry(registry: Registry) -> Self {
        let added = {
            let mut entities: Vec<Entity> = registry.entities().collect();
            entities.sort();
            entities
        };
        Self {
            registry,
            systems: Vec::new(),
            system_types: HashMap::new(),
            managers: Vec::new(),
            manager_types: HashMap::new(),
            added,
            removed: Vec::new(),
            dropping: Vec::new(),
            unscanned: Vec::new(),
            frame: 0,
            _not_send: PhantomData,
        }
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Number of completed frames.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // ---------------------------------------------------------------------------------------------
    // Systems and managers
    // ---------------------------------------------------------------------------------------------

    /// Register a system, replacing any system of the same type.
    ///
    /// The system sees the entities already in the registry at the next `begin`.
    pub fn add_system<S: System>(&mut self, system: S) -> system::Id {
        let name = type_name::<S>();
        let type_id = TypeId::of::<S>();

        let index = match self.system_types.get(&type_id) {
            Some(&index) => {
                debug!("replacing system {name}");
                let id = self.systems[index].id();
                self.systems[index].release(&mut self.registry);
                self.systems[index] = Instance::new(id, name, Box::new(system), &self.registry);
                index
            }
            None => {
                debug!("adding system {name}");
                let index = self.systems.len();
                let id = system::Id::new(index as u32);
                self.systems
                    .push(Instance::new(id, name, Box::new(system), &self.registry));
                self.system_types.insert(type_id, index);
                index
            }
        };

        if !self.unscanned.contains(&index) {
            self.unscanned.push(index);
        }
        self.systems[index].id()
    }

    /// Register a manager, replacing any manager of the same type.
    pub fn add_manager<M: Manager>(&mut self, manager: M) {
        let name = type_name::<M>();
        match self.manager_types.get(&TypeId::of::<M>()) {
            Some(&index) => {
                debug!("replacing manager {name}");
                self.managers[index] = Box::new(manager);
            }
            None => {
                debug!("adding manager {name}");
                self.manager_types
                    .insert(TypeId::of::<M>(), self.managers.len());
                self.managers.push(Box::new(manager));
            }
        }
    }

    fn system_index<S: System>(&self) -> Result<usize> {
        self.system_types
            .get(&TypeId::of::<S>())
            .copied()
            .ok_or(Error::NotFound {
                name: type_name::<S>(),
            })
    }

    fn manager_index<M: Manager>(&self) -> Result<usize> {
        self.manager_types
            .get(&TypeId::of::<M>())
            .copied()
            .ok_or(Error::NotFound {
                name: type_name::<M>(),
            })
    }

    /// The registered system of type `S`.
    pub fn get_system<S: System>(&self) -> Result<&S> {
        let index = self.system_index::<S>()?;
        AsAny::as_any(self.systems[index].system())
            .downcast_ref::<S>()
            .ok_or(Error::NotFound {
                name: type_name::<S>(),
            })
    }

    /// The registered system of type `S`, mutably.
    pub fn get_system_mut<S: System>(&mut self) -> Result<&mut S> {
        let index = self.system_index::<S>()?;
        AsAny::as_any_mut(self.systems[index].system_mut())
            .downcast_mut::<S>()
            .ok_or(Error::NotFound {
                name: type_name::<S>(),
            })
    }

    /// The registered manager of type `M`.
    pub fn get_manager<M: Manager>(&self) -> Result<&M> {
        let index = self.manager_index::<M>()?;
        AsAny::as_any(self.managers[index].as_ref())
            .downcast_ref::<M>()
            .ok_or(Error::NotFound {
                name: type_name::<M>(),
            })
    }

    /// The registered manager of type `M`, mutably.
    pub fn get_manager_mut<M: Manager>(&mut self) -> Result<&mut M> {
        let index = self.manager_index::<M>()?;
        AsAny::as_any_mut(self.managers[index].as_mut())
            .downcast_mut::<M>()
            .ok_or(Error::NotFound {
                name: type_name::<M>(),
            })
    }

    /// The entities system `S` currently tracks, in the order they became active.
    pub fn active_entities<S: System>(&self) -> Result<&[Entity]> {
        let index = self.system_index::<S>()?;
        Ok(self.systems[index].active())
    }

    /// The aspect system `S` was registered with.
    pub fn aspect_of<S: System>(&self) -> Result<&Aspect> {
        let index = self.system_index::<S>()?;
        Ok(self.systems[index].aspect())
    }

    /// Deliver an event to the system of type `S`.
    pub fn send_event<S: System, E: Any>(&mut self, event: E) -> Result<()> {
        let index = self.system_index::<S>()?;
        trace!("sending {} to {}", type_name::<E>(), type_name::<S>());
        self.systems[index]
            .system_mut()
            .on_event(&mut self.registry, &event);
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------------------------------------

    /// Create a named entity. Systems see it at the next `begin`.
    pub fn create(&mut self, name: impl Into<String>) -> Entity {
        self.registry.create(name)
    }

    /// Queue an entity for announcement at the next `begin`, entering it into the registry if
    /// needed.
    pub fn add_entity(&mut self, entity: Entity) {
        if !self.registry.contains(entity) {
            // Entering queues the announcement through the registry's lifecycle events.
            self.registry.enter(entity);
        } else if !self.added.contains(&entity) {
            self.added.push(entity);
        }
    }

    /// Queue an entity to be despawned at the next `begin`.
    ///
    /// The components it owns at that point are destroyed with it.
    pub fn remove_entity(&mut self, entity: Entity) {
        if !self.dropping.contains(&entity) {
            self.dropping.push(entity);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Frame phases
    // ---------------------------------------------------------------------------------------------

    /// Flush the entity changes accumulated since the last frame to every system and manager.
    pub fn begin(&mut self) -> Result<()> {
        for entity in mem::take(&mut self.dropping) {
            self.registry.despawn(entity)?;
        }

        for event in self.registry.drain_events() {
            match event {
                Lifecycle::Entered(entity) if !self.added.contains(&entity) => {
                    self.added.push(entity)
                }
                Lifecycle::Removed(entity) if !self.removed.contains(&entity) => {
                    self.removed.push(entity)
                }
                _ => {}
            }
        }

        let unscanned = mem::take(&mut self.unscanned);
        if !unscanned.is_empty() {
            let mut entities: Vec<Entity> = self.registry.entities().collect();
            entities.sort();
            for index in unscanned {
                for &entity in &entities {
                    self.systems[index].check(&mut self.registry, entity);
                }
            }
        }

        let added = mem::take(&mut self.added);
        for &entity in &added {
            for system in self.systems.iter_mut() {
                system.check(&mut self.registry, entity);
            }
            for manager in self.managers.iter_mut() {
                manager.on_entity_added(&self.registry, entity);
            }
        }

        let changed: Vec<Entity> = self
            .registry
            .synchronize()
            .into_iter()
            .filter(|entity| self.registry.contains(*entity))
            .collect();
        for &entity in &changed {
            for system in self.systems.iter_mut() {
                system.check(&mut self.registry, entity);
            }
            for manager in self.managers.iter_mut() {
                manager.on_entity_changed(&self.registry, entity);
            }
        }

        let removed = mem::take(&mut self.removed);
        for &entity in &removed {
            for system in self.systems.iter_mut() {
                system.forget(&mut self.registry, entity);
            }
            for manager in self.managers.iter_mut() {
                manager.on_entity_removed(&self.registry, entity);
            }
        }

        if !added.is_empty() || !changed.is_empty() || !removed.is_empty() {
            debug!(
                "frame {}: {} added, {} changed, {} removed",
                self.frame,
                added.len(),
                changed.len(),
                removed.len()
            );
        }
        Ok(())
    }

    /// Run every system's processing, in registration order.
    pub fn process(&mut self) {
        for system in self.systems.iter_mut() {
            system.process(&mut self.registry);
        }
    }

    /// Run every system's presentation pass, in registration order.
    pub fn render(&mut self) {
        for system in self.systems.iter_mut() {
            system.render(&self.registry);
        }
    }

    pub fn end(&mut self) {
        self.frame += 1;
        trace!("frame {} ended", self.frame);
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use gem_macros::Component;

    use super::*;
    use crate::ecs::manager::EntityManager;

    #[derive(Component)]
    struct Pos(i32);

    #[derive(Component)]
    struct Vel(i32);

    /// Moves every entity with both a position and a velocity.
    #[derive(Default)]
    struct Movement {
        steps: u32,
        paused: bool,
    }

    impl System for Movement {
        fn aspect(&self, registry: &Registry) -> Aspect {
            registry.aspect_for_all::<(Pos, Vel)>()
        }

        fn check_processing(&self) -> bool {
            !self.paused
        }

        fn process_entities(&mut self, registry: &mut Registry, entities: &[Entity]) {
            self.steps += 1;
            for &entity in entities {
                let Some(dx) = registry.get::<Vel>(entity).map(|vel| vel.0) else {
                    continue;
                };
                if let Some(pos) = registry.get_mut::<Pos>(entity) {
                    pos.0 += dx;
                }
            }
        }

        fn on_event(&mut self, _registry: &mut Registry, event: &dyn Any) {
            if let Some(paused) = event.downcast_ref::<bool>() {
                self.paused = *paused;
            }
        }
    }

    /// Tracks every entity with a position.
    struct Positions;

    impl System for Positions {
        fn aspect(&self, registry: &Registry) -> Aspect {
            registry.aspect_for_all::<Pos>()
        }
    }

    #[derive(Default)]
    struct Journal {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Manager for Journal {
        fn on_entity_added(&mut self, registry: &Registry, entity: Entity) {
            let name = registry.name(entity).unwrap_or_default().to_string();
            self.log.borrow_mut().push(format!("added {name}"));
        }

        fn on_entity_changed(&mut self, registry: &Registry, entity: Entity) {
            let name = registry.name(entity).unwrap_or_default().to_string();
            self.log.borrow_mut().push(format!("changed {name}"));
        }

        fn on_entity_removed(&mut self, _registry: &Registry, _entity: Entity) {
            self.log.borrow_mut().push("removed".to_string());
        }
    }

    fn mover(world: &mut World, name: &str) -> Entity {
        let entity = world.create(name);
        world.registry_mut().attach(entity, Pos(0)).unwrap();
        world.registry_mut().attach(entity, Vel(1)).unwrap();
        entity
    }

    #[test]
    fn entities_become_active_at_begin() {
        // Given
        let mut world = World::new();
        world.add_system(Movement::default());
        let entity = mover(&mut world, "mover");

        // Then - Not visible before begin
        assert!(world.active_entities::<Movement>().unwrap().is_empty());

        // When
        world.begin().unwrap();

        // Then
        assert_eq!(world.active_entities::<Movement>().unwrap(), &[entity]);
    }

    #[test]
    fn membership_is_lost_the_frame_after_a_removal() {
        // Given
        let mut world = World::new();
        world.add_system(Movement::default());
        let entity = mover(&mut world, "mover");
        world.begin().unwrap();

        // When
        world.registry_mut().detach::<Vel>(entity).unwrap();

        // Then - Still active until the next begin
        assert_eq!(world.active_entities::<Movement>().unwrap(), &[entity]);
        world.begin().unwrap();
        assert!(world.active_entities::<Movement>().unwrap().is_empty());
    }

    #[test]
    fn entity_becomes_interested_after_both_attachments() {
        // Given
        let mut world = World::new();
        world.add_system(Movement::default());
        let entity = world.create("e");
        world.registry_mut().attach(entity, Pos(0)).unwrap();
        world.begin().unwrap();

        // Then
        assert!(world.active_entities::<Movement>().unwrap().is_empty());

        // When
        world.registry_mut().attach(entity, Vel(1)).unwrap();
        world.begin().unwrap();

        // Then
        assert_eq!(world.active_entities::<Movement>().unwrap(), &[entity]);
    }

    #[test]
    fn process_runs_systems_over_active_entities() {
        // Given
        let mut world = World::new();
        world.add_system(Movement::default());
        let entity = mover(&mut world, "mover");
        world.begin().unwrap();

        // When
        world.process();
        world.process();
        world.render();
        world.end();

        // Then
        assert_eq!(world.registry().get::<Pos>(entity).map(|p| p.0), Some(2));
        assert_eq!(world.get_system::<Movement>().unwrap().steps, 2);
        assert_eq!(world.frame(), 1);
    }

    #[test]
    fn send_event_reaches_the_system() {
        // Given
        let mut world = World::new();
        world.add_system(Movement::default());
        let entity = mover(&mut world, "mover");
        world.begin().unwrap();

        // When
        world.send_event::<Movement, _>(true).unwrap();
        world.process();

        // Then
        assert_eq!(world.registry().get::<Pos>(entity).map(|p| p.0), Some(0));
        assert_eq!(
            world.send_event::<Positions, _>(false),
            Err(Error::NotFound {
                name: type_name::<Positions>()
            })
        );
    }

    #[test]
    fn missing_systems_and_managers_are_not_found() {
        // Given
        let mut world = World::new();

        // Then
        assert!(matches!(
            world.get_system::<Movement>(),
            Err(Error::NotFound { .. })
        ));
        assert!(world.get_system_mut::<Positions>().is_err());
        assert!(world.get_manager::<EntityManager>().is_err());
        assert!(world.active_entities::<Movement>().is_err());
    }

    #[test]
    fn adding_a_system_twice_replaces_it() {
        // Given
        let mut world = World::new();
        let first = world.add_system(Movement::default());
        let entity = mover(&mut world, "mover");
        world.begin().unwrap();
        world.process();

        // When
        let second = world.add_system(Movement::default());
        world.begin().unwrap();

        // Then
        assert_eq!(first, second);
        assert_eq!(world.get_system::<Movement>().unwrap().steps, 0);
        assert_eq!(world.active_entities::<Movement>().unwrap(), &[entity]);
    }

    #[test]
    fn late_systems_see_existing_entities() {
        // Given
        let mut world = World::new();
        let entity = mover(&mut world, "mover");
        world.begin().unwrap();

        // When
        world.add_system(Positions);
        world.begin().unwrap();

        // Then
        assert_eq!(world.active_entities::<Positions>().unwrap(), &[entity]);
        assert_eq!(
            world.aspect_of::<Positions>().unwrap(),
            &world.registry().aspect_for_all::<Pos>()
        );
    }

    #[test]
    fn remove_entity_is_deferred() {
        // Given
        let mut world = World::new();
        world.add_system(Positions);
        world.add_manager(EntityManager::new());
        let entity = mover(&mut world, "mover");
        world.begin().unwrap();

        // When
        world.remove_entity(entity);

        // Then - Still registered and active until the next begin
        assert!(world.registry().contains(entity));
        assert_eq!(world.active_entities::<Positions>().unwrap(), &[entity]);

        // When
        world.begin().unwrap();

        // Then
        assert!(!world.registry().contains(entity));
        assert!(world.active_entities::<Positions>().unwrap().is_empty());
        let manager = world.get_manager::<EntityManager>().unwrap();
        assert_eq!(manager.active_count(), 0);
        assert_eq!(manager.total_removed(), 1);
    }

    #[test]
    fn removed_entities_release_their_components() {
        // Given
        let mut world = World::new();
        world.add_system(Positions);

        // When
        for round in 0..100 {
            let entity = mover(&mut world, &format!("mover {round}"));
            world.remove_entity(entity);
            world.begin().unwrap();
        }

        // Then
        assert!(world.registry().is_empty());
        assert_eq!(world.registry().component_count(), 0);
        assert!(world.active_entities::<Positions>().unwrap().is_empty());
    }

    #[test]
    fn managers_see_added_changed_and_removed() {
        // Given
        let journal = Journal::default();
        let log = journal.log.clone();
        let mut world = World::new();
        world.add_manager(journal);
        let entity = world.create("hero");
        world.begin().unwrap();

        // When
        world.registry_mut().attach(entity, Pos(0)).unwrap();
        world.begin().unwrap();
        world.remove_entity(entity);
        world.begin().unwrap();

        // Then
        assert_eq!(
            *log.borrow(),
            vec!["added hero", "changed hero", "removed"]
        );
    }

    #[test]
    fn add_entity_enters_unknown_entities_once() {
        // Given
        let mut world = World::new();
        world.add_manager(EntityManager::new());
        let entity = world.registry_mut().alloc();

        // When
        world.add_entity(entity);
        world.add_entity(entity);
        world.begin().unwrap();

        // Then
        assert!(world.registry().contains(entity));
        let manager = world.get_manager::<EntityManager>().unwrap();
        assert_eq!(manager.total_added(), 1);
        assert_eq!(manager.get(entity.id()), Some(entity));
    }

    #[test]
    fn existing_registry_entities_are_announced() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("preloaded");
        registry.attach(entity, Pos(3)).unwrap();
        let mut world = World::with_registry(registry);
        world.add_system(Positions);
        world.add_manager(EntityManager::new());

        // When
        world.begin().unwrap();

        // Then
        assert_eq!(world.active_entities::<Positions>().unwrap(), &[entity]);
        assert_eq!(
            world.get_manager::<EntityManager>().unwrap().total_added(),
            1
        );
    }
}
