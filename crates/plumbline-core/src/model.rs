//! Graph model shared by the source extractor and the diagram interpreter.
//!
//! Both engines emit a [`GraphModel`]: a set of entity names, a capability
//! map and an ordered list of labeled edges. The comparator only ever looks
//! at this shape.

use std::{borrow::Borrow, fmt};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Canonical name of an entity (a class in source, a node in a diagram).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityName(String);

impl EntityName {
    /// Creates an entity name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntityName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EntityName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A capability label such as `drive()`.
///
/// Source methods are labeled `<name>()`; diagram labels are taken verbatim
/// from the edge constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Capability(String);

impl Capability {
    /// Creates a capability from a raw label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Creates the capability label of a method: `name` becomes `name()`.
    pub fn method(name: &str) -> Self {
        Self(format!("{name}()"))
    }

    /// Returns the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Capability {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Capability {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// A directed, labeled relationship: `source` exhibits `capability` when
/// interacting with `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    source: EntityName,
    capability: Capability,
    target: EntityName,
}

impl Edge {
    pub fn new(source: EntityName, capability: Capability, target: EntityName) -> Self {
        Self {
            source,
            capability,
            target,
        }
    }

    pub fn source(&self) -> &EntityName {
        &self.source
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn target(&self) -> &EntityName {
        &self.target
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.capability, self.target)
    }
}

/// Mapping from entity to its set of capability labels.
///
/// Insertion is idempotent and equality ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityMap(IndexMap<EntityName, IndexSet<Capability>>);

impl CapabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `entity` has an entry, possibly empty.
    pub fn ensure(&mut self, entity: &EntityName) {
        if !self.0.contains_key(entity) {
            self.0.insert(entity.clone(), IndexSet::new());
        }
    }

    /// Adds `capability` to `entity`. Returns `true` if it was not present.
    pub fn insert(&mut self, entity: &EntityName, capability: Capability) -> bool {
        self.0
            .entry(entity.clone())
            .or_default()
            .insert(capability)
    }

    /// Unions every capability of `parent` into `child`.
    ///
    /// Returns the number of labels that were new to `child`. An unknown
    /// parent contributes nothing.
    pub fn union_from(&mut self, child: &EntityName, parent: &EntityName) -> usize {
        if child == parent {
            return 0;
        }
        let Some(inherited) = self.0.get(parent).cloned() else {
            return 0;
        };
        let own = self.0.entry(child.clone()).or_default();
        inherited
            .into_iter()
            .filter(|capability| own.insert(capability.clone()))
            .count()
    }

    /// Returns the capabilities of `entity`, if it has an entry.
    pub fn get(&self, entity: &str) -> Option<&IndexSet<Capability>> {
        self.0.get(entity)
    }

    /// Returns `true` if `entity` has `capability`.
    pub fn has(&self, entity: &str, capability: &str) -> bool {
        self.0
            .get(entity)
            .is_some_and(|capabilities| capabilities.contains(capability))
    }

    pub fn contains_entity(&self, entity: &str) -> bool {
        self.0.contains_key(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityName, &IndexSet<Capability>)> {
        self.0.iter()
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityName> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The common output of both engines and the input of the comparator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphModel {
    entities: IndexSet<EntityName>,
    capabilities: CapabilityMap,
    edges: IndexSet<Edge>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an entity. Declaring it again has no effect.
    pub fn add_entity(&mut self, entity: EntityName) {
        self.capabilities.ensure(&entity);
        self.entities.insert(entity);
    }

    /// Adds a capability to an entity, declaring the entity if needed.
    pub fn add_capability(&mut self, entity: &EntityName, capability: Capability) -> bool {
        if !self.entities.contains(entity) {
            self.entities.insert(entity.clone());
        }
        self.capabilities.insert(entity, capability)
    }

    /// Appends an edge unless an identical one is already present.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        self.edges.insert(edge)
    }

    /// Unions `other` into this model.
    ///
    /// Entities and capabilities are set unions; edges keep their order with
    /// duplicates removed.
    pub fn merge(&mut self, other: &GraphModel) {
        for entity in &other.entities {
            self.add_entity(entity.clone());
        }
        for (entity, capabilities) in other.capabilities.iter() {
            self.capabilities.ensure(entity);
            for capability in capabilities {
                self.capabilities.insert(entity, capability.clone());
            }
        }
        for edge in &other.edges {
            self.add_edge(edge.clone());
        }
    }

    pub fn entities(&self) -> &IndexSet<EntityName> {
        &self.entities
    }

    pub fn capabilities(&self) -> &CapabilityMap {
        &self.capabilities
    }

    pub(crate) fn capabilities_mut(&mut self) -> &mut CapabilityMap {
        &mut self.capabilities
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &IndexSet<Edge> {
        &self.edges
    }

    pub fn contains_entity(&self, entity: &str) -> bool {
        self.entities.contains(entity)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_label() {
        assert_eq!(Capability::method("drive").as_str(), "drive()");
    }

    #[test]
    fn test_capability_map_insert_is_idempotent() {
        let mut map = CapabilityMap::new();
        let car = EntityName::new("Car");

        assert!(map.insert(&car, Capability::method("drive")));
        assert!(!map.insert(&car, Capability::method("drive")));
        assert_eq!(map.get("Car").map(|caps| caps.len()), Some(1));
    }

    #[test]
    fn test_capability_map_equality_ignores_order() {
        let car = EntityName::new("Car");
        let mut left = CapabilityMap::new();
        left.insert(&car, Capability::method("drive"));
        left.insert(&car, Capability::method("park"));

        let mut right = CapabilityMap::new();
        right.insert(&car, Capability::method("park"));
        right.insert(&car, Capability::method("drive"));

        assert_eq!(left, right);
    }

    #[test]
    fn test_union_from_unknown_parent() {
        let mut map = CapabilityMap::new();
        let dog = EntityName::new("Dog");
        map.ensure(&dog);

        assert_eq!(map.union_from(&dog, &EntityName::new("Animal")), 0);
        assert!(map.get("Dog").is_some_and(|caps| caps.is_empty()));
    }

    #[test]
    fn test_add_edge_deduplicates() {
        let mut model = GraphModel::new();
        let edge = Edge::new("A".into(), "call()".into(), "B".into());

        assert!(model.add_edge(edge.clone()));
        assert!(!model.add_edge(edge));
        assert_eq!(model.edges().len(), 1);
    }

    #[test]
    fn test_large_broadcast_keeps_first_insertion_order() {
        let mut model = GraphModel::new();
        let edges: Vec<Edge> = (0..200)
            .flat_map(|source| {
                (0..50).map(move |target| {
                    Edge::new(
                        EntityName::new(format!("S{source}")),
                        "store()".into(),
                        EntityName::new(format!("T{target}")),
                    )
                })
            })
            .collect();

        for edge in edges.iter().chain(edges.iter().rev()) {
            model.add_edge(edge.clone());
        }

        assert_eq!(model.edges().len(), edges.len());
        assert!(model.edges().iter().eq(edges.iter()));
    }

    #[test]
    fn test_merge_unions_models() {
        let mut first = GraphModel::new();
        first.add_entity("A".into());
        first.add_capability(&"A".into(), "x()".into());

        let mut second = GraphModel::new();
        second.add_entity("B".into());
        second.add_capability(&"A".into(), "y()".into());
        second.add_edge(Edge::new("A".into(), "y()".into(), "B".into()));

        first.merge(&second);

        assert_eq!(first.entities().len(), 2);
        assert!(first.capabilities().has("A", "x()"));
        assert!(first.capabilities().has("A", "y()"));
        assert_eq!(first.edges().len(), 1);
    }

    #[test]
    fn test_edge_display() {
        let edge = Edge::new("Dog".into(), "bark()".into(), "Cat".into());
        assert_eq!(edge.to_string(), "Dog -[bark()]-> Cat");
    }
}
