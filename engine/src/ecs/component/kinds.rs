use std::{
    any::{TypeId, type_name},
    sync::RwLock,
    sync::atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;

use crate::ecs::component::{Component, Kind, KindSet};

/// A thread-safe table of component kinds.
///
/// Every concrete component type gets exactly one [`Kind`], assigned the first time the type is
/// registered. Lookups are lock-free reads through `DashMap`; registration only takes a single
/// map shard and a write lock on the name list.
///
/// Why thread-safe?
/// - Each world is single-threaded, but several worlds (e.g. one per test or per tool thread) may
///   share one table through an `Arc` so that kinds agree between them.
pub struct Kinds {
    /// Map from the Rust type to its kind.
    type_map: DashMap<TypeId, Kind>,

    /// Type names, indexed by kind. Used for diagnostics only.
    names: RwLock<Vec<&'static str>>,

    /// Next available kind.
    next_id: AtomicU32,
}

impl Default for Kinds {
    fn default() -> Self {
        Self::new()
    }
}

impl Kinds {
    /// Create an empty kind table.
    #[inline]
    pub fn new() -> Self {
        Self {
            type_map: DashMap::new(),
            names: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(0),
        }
    }

    /// Register a component type and get its kind.
    ///
    /// Registration is idempotent: a type that is already known gets its existing kind back.
    pub fn register<C: Component>(&self) -> Kind {
        let type_id = TypeId::of::<C>();

        // Fast path: already registered (lock-free read)
        if let Some(kind) = self.type_map.get(&type_id) {
            return *kind;
        }

        // Entry API so two racing registrations agree on a single kind.
        *self
            .type_map
            .entry(type_id)
            .or_insert_with(|| {
                let kind = Kind(self.next_id.fetch_add(1, Ordering::Relaxed));

                let mut names = self.names.write().unwrap_or_else(|e| e.into_inner());
                if kind.index() >= names.len() {
                    names.resize(kind.index() + 1, "");
                }
                names[kind.index()] = type_name::<C>();

                kind
            })
            .value()
    }

    /// Get the kind of `C`, if it has been registered.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<Kind> {
        self.type_map
            .get(&TypeId::of::<C>())
            .map(|entry| *entry.value())
    }

    /// Get the type name registered for a kind.
    pub fn name(&self, kind: Kind) -> Option<&'static str> {
        let names = self.names.read().unwrap_or_else(|e| e.into_inner());
        names.get(kind.index()).copied().filter(|name| !name.is_empty())
    }

    /// Register every component type in the set `S` and return their kinds.
    #[inline]
    pub fn of<S: KindSet>(&self) -> Vec<Kind> {
        let mut kinds = Vec::new();
        S::collect(self, &mut kinds);
        kinds
    }

    /// Number of registered kinds.
    #[inline]
    pub fn len(&self) -> usize {
        self.next_id.load(Ordering::Relaxed) as usize
    }

    /// Returns true if no kind has been registered yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
