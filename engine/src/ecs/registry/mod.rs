//! The entity registry: the authoritative store mapping entities to their components.
//!
//! The [`Registry`] owns every component instance (attached or not) and every entity record.
//! Attaching and detaching go through [`Registry::add`] and [`Registry::remove`]. Each call keeps
//! the component's [`Ownership`](crate::ecs::component::Ownership) in step with the entity's
//! component map and its cached kind set.
//!
//! Changes are not pushed to systems directly. The registry queues them instead:
//!
//! - entity lifecycle events ([`Lifecycle`]), drained by the world at the start of a frame;
//! - desynchronized components, published by [`Registry::synchronize`] to the triggers registered
//!   for their kind and reported back as the list of entities whose component set changed.
//!
//! There is no process-wide registry: the [`World`](crate::ecs::World) owns one and hands it to
//! systems and managers as their context.

mod record;
mod sync;

use std::{collections::HashMap, mem, sync::Arc};

use log::{debug, trace, warn};

use crate::ecs::{
    Aspect, Result,
    component::{Component, Handle, Kind, KindSet, Kinds, Ownership},
    entity::{self, Entity},
    util::AsAny,
};

pub use record::Record;
pub use sync::{Lifecycle, SyncEvent, Trigger};

use sync::Desync;

/// A component instance and its ownership bookkeeping.
struct Entry {
    kind: Kind,
    ownership: Ownership,
    value: Box<dyn Component>,
}

/// A reusable slot in the component arena.
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

fn entry(slots: &[Slot], handle: Handle) -> Option<&Entry> {
    slots
        .get(handle.index())
        .filter(|slot| slot.generation == handle.generation())
        .and_then(|slot| slot.entry.as_ref())
}

fn entry_mut(slots: &mut [Slot], handle: Handle) -> Option<&mut Entry> {
    slots
        .get_mut(handle.index())
        .filter(|slot| slot.generation == handle.generation())
        .and_then(|slot| slot.entry.as_mut())
}

/// The entity record store.
///
/// Single-threaded: every operation runs to completion and the registry is only ever
/// mutated by one logical thread of control.
pub struct Registry {
    /// Component kind table, shareable between registries.
    kinds: Arc<Kinds>,

    /// Entity handle allocation.
    entities: entity::Allocator,

    /// Entity → record.
    records: HashMap<Entity, Record>,

    /// Component arena.
    slots: Vec<Slot>,

    /// Free arena slots.
    free_slots: Vec<u32>,

    /// Attach/detach transitions not yet synchronized.
    desynced: Vec<Desync>,

    /// Synchronization handlers by component kind, in registration order.
    triggers: Vec<(Kind, Trigger)>,

    /// Pending entity lifecycle events.
    events: Vec<Lifecycle>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry with its own kind table.
    pub fn new() -> Self {
        Self::with_kinds(Arc::new(Kinds::new()))
    }

    /// Create an empty registry sharing an existing kind table.
    pub fn with_kinds(kinds: Arc<Kinds>) -> Self {
        Self {
            kinds,
            entities: entity::Allocator::new(),
            records: HashMap::new(),
            slots: Vec::new(),
            free_slots: Vec::new(),
            desynced: Vec::new(),
            triggers: Vec::new(),
            events: Vec::new(),
        }
    }

    /// The component kind table.
    #[inline]
    pub fn kinds(&self) -> &Arc<Kinds> {
        &self.kinds
    }

    /// Register (if needed) and return the kind of `C`.
    #[inline]
    pub fn kind<C: Component>(&self) -> Kind {
        self.kinds.register::<C>()
    }

    /// Build an aspect requiring every component type in `S`.
    #[inline]
    pub fn aspect_for_all<S: KindSet>(&self) -> Aspect {
        Aspect::for_all(self.kinds.of::<S>())
    }

    fn kind_name(&self, kind: Kind) -> &'static str {
        self.kinds.name(kind).unwrap_or("<unknown>")
    }

    // ---------------------------------------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------------------------------------

    /// Allocate an entity handle without registering it.
    ///
    /// The entity gets a record on [`enter`](Self::enter) or on its first [`add`](Self::add).
    #[inline]
    pub fn alloc(&mut self) -> Entity {
        self.entities.alloc()
    }

    /// Allocate, name and register a new entity.
    pub fn create(&mut self, name: impl Into<String>) -> Entity {
        let entity = self.entities.alloc();
        self.register(entity, name.into());
        entity
    }

    /// Register an entity with zero components.
    ///
    /// Returns `false` without doing anything if the entity is already registered, or if the
    /// handle was not handed out by this registry (or has since been dropped).
    pub fn enter(&mut self, entity: Entity) -> bool {
        if self.records.contains_key(&entity) {
            return false;
        }
        if !self.entities.is_live(entity) {
            warn!("cannot enter {entity}: handle is not live in this registry");
            return false;
        }
        self.register(entity, String::new());
        true
    }

    fn register(&mut self, entity: Entity, name: String) {
        debug!("{entity} entered the registry as {name:?}");
        self.records.insert(entity, Record::new(name));
        self.events.push(Lifecycle::Entered(entity));
    }

    /// Remove every component from an entity, then drop its record.
    ///
    /// The removed components stay in the registry, detached. Returns `Ok(false)` if the entity is
    /// not registered.
    pub fn drop(&mut self, entity: Entity) -> Result<bool> {
        let Some(record) = self.records.get(&entity) else {
            return Ok(false);
        };
        let handles: Vec<Handle> = record.components().map(|(_, handle)| handle).collect();
        for handle in handles {
            self.remove(entity, handle)?;
        }

        self.records.remove(&entity);
        self.entities.free(entity);
        self.events.push(Lifecycle::Removed(entity));
        debug!("{entity} dropped from the registry");

        Ok(true)
    }

    /// Drop an entity and destroy the components it owned.
    pub fn despawn(&mut self, entity: Entity) -> Result<bool> {
        let handles: Vec<Handle> = self.get_components(entity).map(|(_, h)| h).collect();
        if !self.drop(entity)? {
            return Ok(false);
        }
        for handle in handles {
            self.destroy(handle);
        }
        Ok(true)
    }

    /// Determine whether the entity has a record.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.records.contains_key(&entity)
    }

    /// Number of registered entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All registered entities, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.records.keys().copied()
    }

    /// The record of an entity.
    #[inline]
    pub fn record(&self, entity: Entity) -> Option<&Record> {
        self.records.get(&entity)
    }

    #[inline]
    pub(crate) fn record_mut(&mut self, entity: Entity) -> Option<&mut Record> {
        self.records.get_mut(&entity)
    }

    /// The name of a registered entity.
    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.records.get(&entity).map(Record::name)
    }

    /// Rename a registered entity. Returns `false` if it is not registered.
    pub fn set_name(&mut self, entity: Entity, name: impl Into<String>) -> bool {
        match self.records.get_mut(&entity) {
            Some(record) => {
                record.set_name(name.into());
                true
            }
            None => false,
        }
    }

    /// Take the pending entity lifecycle events.
    pub fn drain_events(&mut self) -> Vec<Lifecycle> {
        mem::take(&mut self.events)
    }

    // ---------------------------------------------------------------------------------------------
    // Component instances
    // ---------------------------------------------------------------------------------------------

    /// Move a component value into the registry, detached.
    pub fn insert<C: Component>(&mut self, value: C) -> Handle {
        let kind = self.kinds.register::<C>();
        let index = match self.free_slots.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        let handle = Handle::new(index, slot.generation);
        slot.entry = Some(Entry {
            kind,
            ownership: Ownership::new(handle),
            value: Box::new(value),
        });
        handle
    }

    /// Number of component instances in the registry, attached or not.
    #[inline]
    pub fn component_count(&self) -> usize {
        self.slots.len() - self.free_slots.len()
    }

    /// Free a detached component and return its value.
    ///
    /// Returns `None` for unknown handles and for components that are still attached.
    pub fn destroy(&mut self, handle: Handle) -> Option<Box<dyn Component>> {
        if let Some(owner) = entry(&self.slots, handle)?.ownership.owner() {
            warn!("cannot destroy component {handle}: still attached to {owner}");
            return None;
        }

        let slot = &mut self.slots[handle.index()];
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(handle.index() as u32);
        trace!("component {handle} destroyed");

        Some(entry.value)
    }

    /// Free a detached component of type `C` and return it by value.
    pub fn take<C: Component>(&mut self, handle: Handle) -> Option<C> {
        if self.component_as::<C>(handle).is_none() {
            return None;
        }
        let boxed = self.destroy(handle)?;
        AsAny::into_any(boxed).downcast::<C>().ok().map(|value| *value)
    }

    /// Get a component instance.
    pub fn component(&self, handle: Handle) -> Option<&dyn Component> {
        let entry = entry(&self.slots, handle)?;
        Some(&*entry.value)
    }

    /// Get a mutable component instance.
    pub fn component_mut(&mut self, handle: Handle) -> Option<&mut dyn Component> {
        let entry = entry_mut(&mut self.slots, handle)?;
        Some(&mut *entry.value)
    }

    /// Get a component instance as its concrete type.
    pub fn component_as<C: Component>(&self, handle: Handle) -> Option<&C> {
        AsAny::as_any(self.component(handle)?).downcast_ref::<C>()
    }

    /// Get a mutable component instance as its concrete type.
    pub fn component_as_mut<C: Component>(&mut self, handle: Handle) -> Option<&mut C> {
        AsAny::as_any_mut(self.component_mut(handle)?).downcast_mut::<C>()
    }

    /// The kind of a component instance.
    pub fn kind_of(&self, handle: Handle) -> Option<Kind> {
        entry(&self.slots, handle).map(|entry| entry.kind)
    }

    /// The entity a component is attached to.
    pub fn owner(&self, handle: Handle) -> Option<Entity> {
        entry(&self.slots, handle)?.ownership.owner()
    }

    /// The entity a component was attached to before its last ownership change.
    pub fn previous_owner(&self, handle: Handle) -> Option<Entity> {
        entry(&self.slots, handle)?.ownership.previous_owner()
    }

    // ---------------------------------------------------------------------------------------------
    // Attach / detach
    // ---------------------------------------------------------------------------------------------

    /// Attach a component to an entity.
    ///
    /// An entity without a record is registered, and a component owned by another entity is first
    /// removed from it. The first component of a kind wins: if the entity already has one, the
    /// moved component is left detached and `Ok(false)` is returned. Unknown handles also return
    /// `Ok(false)`.
    ///
    /// Fails with [`Error::OwnershipConflict`](crate::ecs::Error::OwnershipConflict) if the
    /// component's previous owner still lists it.
    pub fn add(&mut self, entity: Entity, component: Handle) -> Result<bool> {
        let Some((kind, owner)) =
            entry(&self.slots, component).map(|entry| (entry.kind, entry.ownership.owner()))
        else {
            warn!("cannot attach component {component} to {entity}: unknown component");
            return Ok(false);
        };

        if !self.records.contains_key(&entity) && !self.enter(entity) {
            return Ok(false);
        }

        if let Some(owner) = owner
            && owner != entity
        {
            trace!("moving component {component} from {owner} to {entity}");
            self.remove(owner, component)?;
        }

        if self
            .records
            .get(&entity)
            .is_some_and(|record| record.get(kind).is_some())
        {
            trace!(
                "{entity} already has a {}, keeping the first one",
                self.kind_name(kind)
            );
            return Ok(false);
        }

        let records = &self.records;
        let Some(entry) = entry_mut(&mut self.slots, component) else {
            return Ok(false);
        };
        let change = entry.ownership.assign(Some(entity), |previous| {
            records
                .get(&previous)
                .is_some_and(|record| record.lists(kind, component))
        })?;

        if let Some(record) = self.records.get_mut(&entity) {
            record.insert(kind, component);
        }
        if let Some(change) = change {
            entry.value.on_attached(&change);
        }

        self.desync(component, kind, entity);
        trace!(
            "component {component} ({}) attached to {entity}",
            self.kind_name(kind)
        );

        Ok(true)
    }

    /// Detach a component from an entity.
    ///
    /// Returns `Ok(false)` without changing anything if the entity or component is unknown, or if
    /// the component is owned by a different entity (a stale removal).
    pub fn remove(&mut self, entity: Entity, component: Handle) -> Result<bool> {
        let Some((kind, owner)) =
            entry(&self.slots, component).map(|entry| (entry.kind, entry.ownership.owner()))
        else {
            return Ok(false);
        };

        if let Some(owner) = owner
            && owner != entity
        {
            warn!("stale removal of component {component} from {entity}: it is owned by {owner}");
            return Ok(false);
        }

        let Some(record) = self.records.get_mut(&entity) else {
            return Ok(false);
        };
        let erased = record.remove(kind, component);
        if !erased && owner.is_none() {
            return Ok(false);
        }

        let records = &self.records;
        let Some(entry) = entry_mut(&mut self.slots, component) else {
            return Ok(false);
        };
        let assigned = entry.ownership.assign(None, |previous| {
            records
                .get(&previous)
                .is_some_and(|record| record.lists(kind, component))
        });
        match assigned {
            Ok(Some(change)) => entry.value.on_detached(&change),
            Ok(None) => {}
            Err(error) => {
                if erased && let Some(record) = self.records.get_mut(&entity) {
                    record.insert(kind, component);
                }
                return Err(error);
            }
        }

        self.desync(component, kind, entity);
        trace!(
            "component {component} ({}) detached from {entity}",
            self.kind_name(kind)
        );

        Ok(erased)
    }

    /// Move a component value into the registry and attach it.
    ///
    /// Returns `Ok(None)` and discards the value if the entity already has a component of this
    /// kind.
    pub fn attach<C: Component>(&mut self, entity: Entity, value: C) -> Result<Option<Handle>> {
        let handle = self.insert(value);
        match self.add(entity, handle) {
            Ok(true) => Ok(Some(handle)),
            Ok(false) => {
                self.destroy(handle);
                Ok(None)
            }
            Err(error) => {
                self.destroy(handle);
                Err(error)
            }
        }
    }

    /// Detach the component of type `C` from an entity and return it by value.
    pub fn detach<C: Component>(&mut self, entity: Entity) -> Result<Option<C>> {
        let Some(handle) = self
            .kinds
            .get::<C>()
            .and_then(|kind| self.get_component(entity, kind))
        else {
            return Ok(None);
        };
        if !self.remove(entity, handle)? {
            return Ok(None);
        }
        Ok(self.take::<C>(handle))
    }

    // ---------------------------------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------------------------------

    /// The component of `kind` attached to an entity.
    pub fn get_component(&self, entity: Entity, kind: Kind) -> Option<Handle> {
        self.records.get(&entity)?.get(kind)
    }

    /// All components attached to an entity. Empty for unregistered entities.
    pub fn get_components(&self, entity: Entity) -> impl Iterator<Item = (Kind, Handle)> + '_ {
        self.records
            .get(&entity)
            .into_iter()
            .flat_map(Record::components)
    }

    /// Determine whether this exact component is attached to the entity.
    pub fn has_component(&self, entity: Entity, component: Handle) -> bool {
        self.kind_of(component).is_some_and(|kind| {
            self.records
                .get(&entity)
                .is_some_and(|record| record.lists(kind, component))
        })
    }

    /// Determine whether the entity has a component of type `C`.
    pub fn has<C: Component>(&self, entity: Entity) -> bool {
        self.kinds.get::<C>().is_some_and(|kind| {
            self.records
                .get(&entity)
                .is_some_and(|record| record.has_kind(kind))
        })
    }

    /// The component of type `C` attached to an entity.
    pub fn get<C: Component>(&self, entity: Entity) -> Option<&C> {
        let handle = self.get_component(entity, self.kinds.get::<C>()?)?;
        self.component_as::<C>(handle)
    }

    /// The component of type `C` attached to an entity, mutably.
    pub fn get_mut<C: Component>(&mut self, entity: Entity) -> Option<&mut C> {
        let handle = self.get_component(entity, self.kinds.get::<C>()?)?;
        self.component_as_mut::<C>(handle)
    }

    // ---------------------------------------------------------------------------------------------
    // Synchronization
    // ---------------------------------------------------------------------------------------------

    fn desync(&mut self, component: Handle, kind: Kind, entity: Entity) {
        let desync = Desync {
            component,
            kind,
            entity,
        };
        if !self.desynced.contains(&desync) {
            self.desynced.push(desync);
        }
    }

    /// Register the handler called by [`synchronize`](Self::synchronize) for components of
    /// `kind`, replacing any previous handler for that kind.
    pub fn set_trigger(&mut self, kind: Kind, handler: impl FnMut(&SyncEvent) + 'static) {
        let handler: Trigger = Box::new(handler);
        match self.triggers.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, trigger)) => *trigger = handler,
            None => self.triggers.push((kind, handler)),
        }
    }

    /// Remove the handler for `kind`. Returns whether one was registered.
    pub fn clear_trigger(&mut self, kind: Kind) -> bool {
        let before = self.triggers.len();
        self.triggers.retain(|(k, _)| *k != kind);
        self.triggers.len() != before
    }

    /// Returns true while there are attach/detach transitions that have not been synchronized.
    #[inline]
    pub fn need_sync(&self) -> bool {
        !self.desynced.is_empty()
    }

    /// Publish pending transitions to the triggers and clear them.
    ///
    /// Each trigger receives one [`SyncEvent`] listing the changed components of its kind, split by
    /// whether they are currently attached. Returns the distinct entities whose component set
    /// changed, in the order they first changed.
    pub fn synchronize(&mut self) -> Vec<Entity> {
        if self.desynced.is_empty() {
            return Vec::new();
        }
        let desynced = mem::take(&mut self.desynced);

        for (kind, trigger) in self.triggers.iter_mut() {
            let mut event = SyncEvent::new(*kind);
            for desync in desynced.iter().filter(|desync| desync.kind == *kind) {
                let attached = entry(&self.slots, desync.component)
                    .is_some_and(|entry| entry.ownership.owner().is_some());
                event.push(desync.component, attached);
            }
            if !event.is_empty() {
                trigger(&event);
            }
        }

        let mut changed = Vec::new();
        for desync in &desynced {
            if !changed.contains(&desync.entity) {
                changed.push(desync.entity);
            }
        }
        trace!("synchronized {} component change(s)", desynced.len());
        changed
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use gem_macros::Component;

    use super::*;
    use crate::ecs::{Error, component::Change};

    #[derive(Component, Debug, PartialEq)]
    struct Pos {
        x: i32,
        y: i32,
    }

    #[derive(Component, Debug, PartialEq)]
    struct Vel {
        dx: i32,
        dy: i32,
    }

    /// Records every ownership change it sees.
    struct Probe {
        log: Rc<RefCell<Vec<(&'static str, Change)>>>,
    }

    impl Component for Probe {
        fn on_attached(&mut self, change: &Change) {
            self.log.borrow_mut().push(("attached", *change));
        }

        fn on_detached(&mut self, change: &Change) {
            self.log.borrow_mut().push(("detached", *change));
        }
    }

    #[test]
    fn enter_registers_once() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.alloc();

        // When
        let first = registry.enter(entity);
        let second = registry.enter(entity);

        // Then
        assert!(first);
        assert!(!second);
        assert!(registry.contains(entity));
        assert_eq!(registry.get_components(entity).count(), 0);
        assert_eq!(registry.drain_events(), vec![Lifecycle::Entered(entity)]);
    }

    #[test]
    fn enter_rejects_foreign_handles() {
        // Given
        let mut other = Registry::new();
        other.alloc();
        let foreign = other.alloc();
        let mut registry = Registry::new();

        // When
        let entered = registry.enter(foreign);

        // Then
        assert!(!entered);
        assert!(registry.drain_events().is_empty());
    }

    #[test]
    fn add_attaches_and_sets_owner() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("player");
        let pos = registry.insert(Pos { x: 1, y: 2 });

        // When
        let added = registry.add(entity, pos).unwrap();

        // Then
        assert!(added);
        let kind = registry.kind::<Pos>();
        assert_eq!(registry.get_component(entity, kind), Some(pos));
        assert_eq!(registry.owner(pos), Some(entity));
        assert_eq!(registry.get::<Pos>(entity), Some(&Pos { x: 1, y: 2 }));
        assert!(registry.record(entity).unwrap().has_kind(kind));
        assert!(registry.has_component(entity, pos));
    }

    #[test]
    fn duplicate_kind_keeps_first_component() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("player");
        let first = registry.insert(Pos { x: 1, y: 1 });
        let second = registry.insert(Pos { x: 2, y: 2 });
        registry.add(entity, first).unwrap();

        // When
        let added = registry.add(entity, second).unwrap();

        // Then
        assert!(!added);
        assert_eq!(
            registry.get_component(entity, registry.kind::<Pos>()),
            Some(first)
        );
        assert_eq!(registry.owner(second), None);
        assert_eq!(registry.get_components(entity).count(), 1);
    }

    #[test]
    fn rejected_move_still_detaches_from_previous_owner() {
        // Given
        let mut registry = Registry::new();
        let first = registry.create("first");
        let second = registry.create("second");
        let moved = registry.attach(first, Pos { x: 1, y: 1 }).unwrap().unwrap();
        let kept = registry.attach(second, Pos { x: 2, y: 2 }).unwrap().unwrap();

        // When
        let added = registry.add(second, moved).unwrap();

        // Then
        assert!(!added);
        let kind = registry.kind::<Pos>();
        assert_eq!(registry.get_component(first, kind), None);
        assert_eq!(registry.owner(moved), None);
        assert_eq!(registry.previous_owner(moved), Some(first));
        assert_eq!(registry.get_component(second, kind), Some(kept));
    }

    #[test]
    fn add_then_remove_round_trip() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("player");
        let pos = registry.insert(Pos { x: 0, y: 0 });
        registry.add(entity, pos).unwrap();

        // When
        let removed = registry.remove(entity, pos).unwrap();

        // Then
        assert!(removed);
        assert_eq!(registry.get_component(entity, registry.kind::<Pos>()), None);
        assert_eq!(registry.owner(pos), None);
        assert_eq!(registry.previous_owner(pos), Some(entity));
        assert!(!registry.record(entity).unwrap().has_kind(registry.kind::<Pos>()));
    }

    #[test]
    fn add_moves_component_from_previous_owner() {
        // Given
        let mut registry = Registry::new();
        let e1 = registry.create("first");
        let e2 = registry.create("second");
        let pos = registry.insert(Pos { x: 0, y: 0 });
        registry.add(e1, pos).unwrap();

        // When
        let added = registry.add(e2, pos).unwrap();

        // Then
        assert!(added);
        assert!(!registry.has::<Pos>(e1));
        assert!(registry.has::<Pos>(e2));
        assert_eq!(registry.owner(pos), Some(e2));
    }

    #[test]
    fn stale_removal_is_rejected() {
        // Given
        let mut registry = Registry::new();
        let e1 = registry.create("first");
        let e2 = registry.create("second");
        let pos = registry.insert(Pos { x: 0, y: 0 });
        registry.add(e1, pos).unwrap();

        // When
        let removed = registry.remove(e2, pos).unwrap();

        // Then
        assert!(!removed);
        assert_eq!(registry.owner(pos), Some(e1));
        assert!(registry.has_component(e1, pos));
    }

    #[test]
    fn unknown_handles_are_soft_failures() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("player");
        let pos = registry.insert(Pos { x: 0, y: 0 });
        registry.destroy(pos);

        // Then
        assert!(!registry.add(entity, pos).unwrap());
        assert!(!registry.remove(entity, pos).unwrap());
        assert!(registry.component(pos).is_none());
    }

    #[test]
    fn add_registers_unknown_entity() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.alloc();
        let pos = registry.insert(Pos { x: 0, y: 0 });

        // When
        let added = registry.add(entity, pos).unwrap();

        // Then
        assert!(added);
        assert!(registry.contains(entity));
        assert_eq!(registry.drain_events(), vec![Lifecycle::Entered(entity)]);
    }

    #[test]
    fn component_sets_follow_attachments() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("mover");

        // When
        registry.attach(entity, Pos { x: 0, y: 0 }).unwrap();
        let again = registry.attach(entity, Pos { x: 9, y: 9 }).unwrap();
        let size_after_duplicate = registry.get_components(entity).count();
        registry.attach(entity, Vel { dx: 1, dy: 0 }).unwrap();

        // Then
        assert!(again.is_none());
        assert_eq!(size_after_duplicate, 1);
        assert_eq!(registry.get_components(entity).count(), 2);
        assert_eq!(registry.get::<Pos>(entity), Some(&Pos { x: 0, y: 0 }));
    }

    #[test]
    fn drop_removes_components_and_record() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("doomed");
        let pos = registry.attach(entity, Pos { x: 0, y: 0 }).unwrap().unwrap();
        let vel = registry.attach(entity, Vel { dx: 0, dy: 0 }).unwrap().unwrap();
        registry.drain_events();

        // When
        let dropped = registry.drop(entity).unwrap();

        // Then
        assert!(dropped);
        assert!(!registry.contains(entity));
        assert_eq!(registry.owner(pos), None);
        assert_eq!(registry.owner(vel), None);
        assert_eq!(registry.drain_events(), vec![Lifecycle::Removed(entity)]);
        assert!(!registry.drop(entity).unwrap());
        assert_eq!(registry.get_components(entity).count(), 0);
    }

    #[test]
    fn despawn_destroys_owned_components() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("doomed");
        let pos = registry.attach(entity, Pos { x: 0, y: 0 }).unwrap().unwrap();

        // When
        let despawned = registry.despawn(entity).unwrap();

        // Then
        assert!(despawned);
        assert!(registry.component(pos).is_none());
    }

    #[test]
    fn destroy_requires_detached_component() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("holder");
        let pos = registry.attach(entity, Pos { x: 3, y: 4 }).unwrap().unwrap();

        // Then - Attached components cannot be destroyed
        assert!(registry.destroy(pos).is_none());

        // When
        registry.remove(entity, pos).unwrap();
        let value = registry.take::<Pos>(pos);

        // Then
        assert_eq!(value, Some(Pos { x: 3, y: 4 }));
        assert!(registry.component(pos).is_none());
    }

    #[test]
    fn take_with_wrong_type_keeps_component() {
        // Given
        let mut registry = Registry::new();
        let pos = registry.insert(Pos { x: 3, y: 4 });

        // When
        let value = registry.take::<Vel>(pos);

        // Then
        assert!(value.is_none());
        assert!(registry.component_as::<Pos>(pos).is_some());
    }

    #[test]
    fn recycled_slots_do_not_resolve_old_handles() {
        // Given
        let mut registry = Registry::new();
        let old = registry.insert(Pos { x: 0, y: 0 });
        registry.destroy(old);

        // When
        let new = registry.insert(Vel { dx: 1, dy: 1 });

        // Then
        assert_eq!(old.index(), new.index());
        assert!(registry.component(old).is_none());
        assert!(registry.component_as::<Vel>(new).is_some());
    }

    #[test]
    fn detach_returns_value() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("holder");
        registry.attach(entity, Vel { dx: 5, dy: 6 }).unwrap();

        // When
        let value = registry.detach::<Vel>(entity).unwrap();

        // Then
        assert_eq!(value, Some(Vel { dx: 5, dy: 6 }));
        assert!(!registry.has::<Vel>(entity));
        assert_eq!(registry.detach::<Vel>(entity).unwrap(), None);
    }

    #[test]
    fn get_mut_updates_component() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("mover");
        registry.attach(entity, Pos { x: 0, y: 0 }).unwrap();

        // When
        if let Some(pos) = registry.get_mut::<Pos>(entity) {
            pos.x = 10;
        }

        // Then
        assert_eq!(registry.get::<Pos>(entity), Some(&Pos { x: 10, y: 0 }));
    }

    #[test]
    fn lookups_on_unregistered_entity_are_empty() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.alloc();

        // Then
        assert!(registry.get::<Pos>(entity).is_none());
        assert_eq!(registry.get_component(entity, registry.kind::<Pos>()), None);
        assert_eq!(registry.get_components(entity).count(), 0);
        assert_eq!(registry.name(entity), None);
    }

    #[test]
    fn names() {
        // Given
        let mut registry = Registry::new();
        let entity = registry.create("gem");

        // When
        let renamed = registry.set_name(entity, "red gem");

        // Then
        assert!(renamed);
        assert_eq!(registry.name(entity), Some("red gem"));
    }

    #[test]
    fn callbacks_fire_on_ownership_changes() {
        // Given
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new();
        let e1 = registry.create("first");
        let e2 = registry.create("second");
        let probe = registry.insert(Probe { log: log.clone() });

        // When
        registry.add(e1, probe).unwrap();
        registry.add(e2, probe).unwrap();

        // Then
        assert_eq!(
            *log.borrow(),
            vec![
                (
                    "attached",
                    Change {
                        owner: Some(e1),
                        previous_owner: None
                    }
                ),
                (
                    "detached",
                    Change {
                        owner: None,
                        previous_owner: Some(e1)
                    }
                ),
                (
                    "attached",
                    Change {
                        owner: Some(e2),
                        previous_owner: None
                    }
                ),
            ]
        );
    }

    #[test]
    fn unsynchronized_previous_owner_conflicts() {
        // Given - e1 still lists the component although it was detached behind the registry's back
        let mut registry = Registry::new();
        let e1 = registry.create("first");
        let e2 = registry.create("second");
        let pos = registry.insert(Pos { x: 0, y: 0 });
        let kind = registry.kind::<Pos>();
        registry.add(e1, pos).unwrap();
        entry_mut(&mut registry.slots, pos)
            .unwrap()
            .ownership
            .assign(None, |_| false)
            .unwrap();

        // When
        let result = registry.add(e2, pos);

        // Then
        assert_eq!(
            result,
            Err(Error::OwnershipConflict {
                component: pos,
                previous_owner: e1
            })
        );
        assert!(registry.record(e1).unwrap().lists(kind, pos));
        assert!(!registry.has::<Pos>(e2));
    }

    #[test]
    fn synchronize_runs_triggers_and_reports_changed_entities() {
        // Given
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new();
        let pos_kind = registry.kind::<Pos>();
        let seen = events.clone();
        registry.set_trigger(pos_kind, move |event: &SyncEvent| {
            seen.borrow_mut()
                .push((event.attached().to_vec(), event.detached().to_vec()));
        });

        let e1 = registry.create("first");
        let e2 = registry.create("second");
        let kept = registry.attach(e1, Pos { x: 0, y: 0 }).unwrap().unwrap();
        let dropped = registry.attach(e2, Pos { x: 1, y: 1 }).unwrap().unwrap();
        registry.attach(e2, Vel { dx: 0, dy: 0 }).unwrap();
        registry.remove(e2, dropped).unwrap();

        // When
        assert!(registry.need_sync());
        let changed = registry.synchronize();

        // Then
        assert_eq!(changed, vec![e1, e2]);
        assert_eq!(*events.borrow(), vec![(vec![kept], vec![dropped])]);
        assert!(!registry.need_sync());
        assert!(registry.synchronize().is_empty());
    }

    #[test]
    fn cleared_triggers_are_not_called() {
        // Given
        let calls = Rc::new(RefCell::new(0));
        let mut registry = Registry::new();
        let kind = registry.kind::<Pos>();
        let counter = calls.clone();
        registry.set_trigger(kind, move |_| *counter.borrow_mut() += 1);

        // When
        let cleared = registry.clear_trigger(kind);
        let entity = registry.create("e");
        registry.attach(entity, Pos { x: 0, y: 0 }).unwrap();
        registry.synchronize();

        // Then
        assert!(cleared);
        assert!(!registry.clear_trigger(kind));
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn shared_kind_tables_agree() {
        // Given
        let kinds = Arc::new(Kinds::new());
        let first = Registry::with_kinds(kinds.clone());
        let second = Registry::with_kinds(kinds);

        // Then
        assert_eq!(first.kind::<Vel>(), second.kind::<Vel>());
        assert_eq!(
            first.aspect_for_all::<(Pos, Vel)>(),
            second.aspect_for_all::<(Pos, Vel)>()
        );
    }
}
