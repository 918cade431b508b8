use std::collections::HashMap;

use fixedbitset::FixedBitSet;

use crate::ecs::{component, system};

/// Everything the registry knows about one entity.
///
/// The kind set always mirrors the keys of the component map; the system set lists the systems
/// that currently track the entity.
#[derive(Debug, Default)]
pub struct Record {
    /// Display name of the entity.
    name: String,

    /// Attached components, at most one per kind.
    components: HashMap<component::Kind, component::Handle>,

    /// Cached kind set for O(1) membership tests.
    kinds: FixedBitSet,

    /// Systems currently tracking the entity.
    systems: FixedBitSet,
}

impl Record {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// The component attached for `kind`, if any.
    #[inline]
    pub fn get(&self, kind: component::Kind) -> Option<component::Handle> {
        self.components.get(&kind).copied()
    }

    /// Determine whether this exact component is attached.
    #[inline]
    pub fn lists(&self, kind: component::Kind, handle: component::Handle) -> bool {
        self.get(kind) == Some(handle)
    }

    /// All attached components.
    pub fn components(&self) -> impl Iterator<Item = (component::Kind, component::Handle)> + '_ {
        self.components.iter().map(|(kind, handle)| (*kind, *handle))
    }

    /// Number of attached components.
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The kinds of the attached components.
    #[inline]
    pub fn kinds(&self) -> &FixedBitSet {
        &self.kinds
    }

    #[inline]
    pub fn has_kind(&self, kind: component::Kind) -> bool {
        self.kinds.contains(kind.index())
    }

    /// Determine whether the given system currently tracks this entity.
    #[inline]
    pub fn is_tracked_by(&self, system: system::Id) -> bool {
        self.systems.contains(system.index())
    }

    /// Insert a component unless its kind is already present. Returns whether it was inserted.
    pub(crate) fn insert(&mut self, kind: component::Kind, handle: component::Handle) -> bool {
        if self.components.contains_key(&kind) {
            return false;
        }
        self.components.insert(kind, handle);
        self.kinds.grow(kind.index() + 1);
        self.kinds.insert(kind.index());
        true
    }

    /// Remove the component of `kind` if it is exactly `handle`.
    pub(crate) fn remove(&mut self, kind: component::Kind, handle: component::Handle) -> bool {
        if !self.lists(kind, handle) {
            return false;
        }
        self.components.remove(&kind);
        self.kinds.set(kind.index(), false);
        true
    }

    pub(crate) fn track(&mut self, system: system::Id) {
        self.systems.grow(system.index() + 1);
        self.systems.insert(system.index());
    }

    pub(crate) fn untrack(&mut self, system: system::Id) {
        if system.index() < self.systems.len() {
            self.systems.set(system.index(), false);
        }
    }
}
