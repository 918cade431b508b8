use std::collections::HashMap;

use log::{debug, warn};

use crate::ecs::{Component, Registry, Result, entity::Entity};

type Step = Box<dyn Fn(&mut Registry, Entity) -> Result<bool>>;

/// A named recipe that populates an entity with components.
///
/// ```ignore
/// let template = Template::new()
///     .with::<Position>()
///     .with_factory(|| Health(100));
/// ```
#[derive(Default)]
pub struct Template {
    steps: Vec<Step>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a default-constructed `C`.
    pub fn with<C: Component + Default>(self) -> Self {
        self.with_factory(C::default)
    }

    /// Attach a `C` built by `factory` every time the template is applied.
    pub fn with_factory<C, F>(mut self, factory: F) -> Self
    where
        C: Component,
        F: Fn() -> C + 'static,
    {
        self.steps.push(Box::new(move |registry, entity| {
            Ok(registry.attach(entity, factory())?.is_some())
        }));
        self
    }

    /// Number of components the template attaches.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Attach every component of the template to `entity`.
    ///
    /// Components whose kind the entity already has are skipped. Returns the number attached.
    pub fn apply(&self, registry: &mut Registry, entity: Entity) -> Result<usize> {
        let mut attached = 0;
        for step in &self.steps {
            if step(registry, entity)? {
                attached += 1;
            }
        }
        Ok(attached)
    }
}

/// Entity templates by name.
#[derive(Default)]
pub struct Definitions {
    templates: HashMap<String, Template>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under `name`, replacing any previous one.
    pub fn define(&mut self, name: impl Into<String>, template: Template) {
        let name = name.into();
        debug!("entity definition {name:?} registered");
        self.templates.insert(name, template);
    }

    /// Forget a template. Returns whether it existed.
    pub fn undefine(&mut self, name: &str) -> bool {
        self.templates.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Populate `entity` from the template registered under `name`.
    ///
    /// Returns `Ok(false)` and logs a warning if no such template exists.
    pub fn make(&self, name: &str, entity: Entity, registry: &mut Registry) -> Result<bool> {
        let Some(template) = self.templates.get(name) else {
            warn!("no entity definition named {name:?}");
            return Ok(false);
        };
        let attached = template.apply(registry, entity)?;
        debug!("{entity} made from {name:?} with {attached} component(s)");
        Ok(true)
    }

    /// Create a new entity named after the template and populate it.
    pub fn spawn(&self, name: &str, registry: &mut Registry) -> Result<Option<Entity>> {
        if !self.contains(name) {
            warn!("no entity definition named {name:?}");
            return Ok(None);
        }
        let entity = registry.create(name);
        self.make(name, entity, registry)?;
        Ok(Some(entity))
    }
}
