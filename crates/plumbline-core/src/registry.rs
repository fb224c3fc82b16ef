//! Entity registry: declared entities plus binding names that refer to them.
//!
//! A binding is an indirection local to one interpretation pass. It names
//! either a single entity or an ordered list of entities and never appears in
//! a [`GraphModel`](crate::model::GraphModel).

use std::collections::HashMap;

use indexmap::IndexSet;
use log::trace;

use crate::model::EntityName;

/// What a binding name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// A single entity.
    Entity(EntityName),
    /// An ordered list of entities.
    Collection(Vec<EntityName>),
}

impl Binding {
    /// Returns the referenced entities in order.
    pub fn entities(&self) -> &[EntityName] {
        match self {
            Binding::Entity(entity) => std::slice::from_ref(entity),
            Binding::Collection(entities) => entities,
        }
    }
}

/// Ordered set of declared entities and the bindings that refer to them.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: IndexSet<EntityName>,
    bindings: HashMap<String, Binding>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an entity and returns its canonical name.
    ///
    /// Declaring the same name twice yields the same entity.
    pub fn declare(&mut self, name: &str) -> EntityName {
        if let Some(existing) = self.entities.get(name) {
            return existing.clone();
        }
        let entity = EntityName::new(name);
        trace!(entity = name; "Declared entity");
        self.entities.insert(entity.clone());
        entity
    }

    /// Binds `name`, replacing any earlier binding. Returns the replaced one.
    pub fn bind(&mut self, name: &str, binding: Binding) -> Option<Binding> {
        self.bindings.insert(name.to_string(), binding)
    }

    /// Removes the binding for `name`.
    pub fn unbind(&mut self, name: &str) -> Option<Binding> {
        self.bindings.remove(name)
    }

    /// Looks up what `name` is bound to.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }
}
