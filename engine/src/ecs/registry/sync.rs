use crate::ecs::{component, entity::Entity};

/// Entity lifecycle notifications queued by the registry and drained by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// The entity gained a registry record for the first time.
    Entered(Entity),

    /// The entity's record was dropped.
    Removed(Entity),
}

/// An attach or detach transition that has not been published yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Desync {
    pub(crate) component: component::Handle,
    pub(crate) kind: component::Kind,
    /// The entity whose component set changed.
    pub(crate) entity: Entity,
}

/// Components of one kind that changed owner since the last synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncEvent {
    kind: component::Kind,
    attached: Vec<component::Handle>,
    detached: Vec<component::Handle>,
}

impl SyncEvent {
    pub(crate) fn new(kind: component::Kind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub(crate) fn push(&mut self, handle: component::Handle, attached: bool) {
        let list = if attached {
            &mut self.attached
        } else {
            &mut self.detached
        };
        if !list.contains(&handle) {
            list.push(handle);
        }
    }

    /// The kind this event reports on.
    #[inline]
    pub fn kind(&self) -> component::Kind {
        self.kind
    }

    /// Components currently attached to an entity.
    #[inline]
    pub fn attached(&self) -> &[component::Handle] {
        &self.attached
    }

    /// Components currently detached.
    #[inline]
    pub fn detached(&self) -> &[component::Handle] {
        &self.detached
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty()
    }
}

/// A handler invoked by [`Registry::synchronize`](super::Registry::synchronize).
pub type Trigger = Box<dyn FnMut(&SyncEvent)>;
