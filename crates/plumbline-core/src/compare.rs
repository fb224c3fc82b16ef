//! Consistency comparator.
//!
//! [`compare`] diffs a model extracted from code against a model interpreted
//! from a diagram. It is pure and total: any two models produce a
//! [`Discrepancies`] value, possibly empty.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::Serialize;

use crate::model::{Capability, EntityName, GraphModel};

/// Differences between a code model and a diagram model.
///
/// "Missing" means present in the diagram but absent from the code; "extra"
/// means present in the code but absent from the diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Discrepancies {
    missing_entities: BTreeSet<EntityName>,
    extra_entities: BTreeSet<EntityName>,
    missing_capabilities: BTreeMap<EntityName, BTreeSet<Capability>>,
    extra_capabilities: BTreeMap<EntityName, BTreeSet<Capability>>,
}

impl Discrepancies {
    /// Entities in the diagram with no class in the code.
    pub fn missing_entities(&self) -> &BTreeSet<EntityName> {
        &self.missing_entities
    }

    /// Classes in the code with no entity in the diagram.
    pub fn extra_entities(&self) -> &BTreeSet<EntityName> {
        &self.extra_entities
    }

    /// Capabilities the diagram shows that the code does not declare or inherit.
    pub fn missing_capabilities(&self) -> &BTreeMap<EntityName, BTreeSet<Capability>> {
        &self.missing_capabilities
    }

    /// Capabilities the code has that the diagram does not show.
    pub fn extra_capabilities(&self) -> &BTreeMap<EntityName, BTreeSet<Capability>> {
        &self.extra_capabilities
    }

    /// Returns `true` if the two models agree.
    pub fn is_consistent(&self) -> bool {
        self.missing_entities.is_empty()
            && self.extra_entities.is_empty()
            && self.missing_capabilities.is_empty()
            && self.extra_capabilities.is_empty()
    }

    /// Total number of individual differences.
    pub fn count(&self) -> usize {
        self.missing_entities.len()
            + self.extra_entities.len()
            + self.missing_capabilities.values().map(BTreeSet::len).sum::<usize>()
            + self.extra_capabilities.values().map(BTreeSet::len).sum::<usize>()
    }
}

impl fmt::Display for Discrepancies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_consistent() {
            return writeln!(f, "Diagram and code are consistent.");
        }

        if !self.missing_entities.is_empty() {
            writeln!(f, "Entities in the diagram but missing from the code:")?;
            for entity in &self.missing_entities {
                writeln!(f, "  - {entity}")?;
            }
        }
        if !self.extra_entities.is_empty() {
            writeln!(f, "Entities in the code but missing from the diagram:")?;
            for entity in &self.extra_entities {
                writeln!(f, "  - {entity}")?;
            }
        }
        if !self.missing_capabilities.is_empty() {
            writeln!(f, "Capabilities in the diagram but missing from the code:")?;
            write_capabilities(f, &self.missing_capabilities)?;
        }
        if !self.extra_capabilities.is_empty() {
            writeln!(f, "Capabilities in the code but missing from the diagram:")?;
            write_capabilities(f, &self.extra_capabilities)?;
        }
        Ok(())
    }
}

fn write_capabilities(
    f: &mut fmt::Formatter<'_>,
    capabilities: &BTreeMap<EntityName, BTreeSet<Capability>>,
) -> fmt::Result {
    for (entity, labels) in capabilities {
        let labels: Vec<&str> = labels.iter().map(Capability::as_str).collect();
        writeln!(f, "  - {entity}: {}", labels.join(", "))?;
    }
    Ok(())
}

/// Compares a code model with a diagram model.
pub fn compare(code: &GraphModel, diagram: &GraphModel) -> Discrepancies {
    let missing_entities = difference(diagram.entities().iter(), |e| code.contains_entity(e.as_str()));
    let extra_entities = difference(code.entities().iter(), |e| diagram.contains_entity(e.as_str()));

    let keys: BTreeSet<&EntityName> = code
        .capabilities()
        .entities()
        .chain(diagram.capabilities().entities())
        .collect();

    let mut missing_capabilities = BTreeMap::new();
    let mut extra_capabilities = BTreeMap::new();
    for entity in keys {
        let missing = capability_difference(diagram, code, entity);
        if !missing.is_empty() {
            missing_capabilities.insert(entity.clone(), missing);
        }
        let extra = capability_difference(code, diagram, entity);
        if !extra.is_empty() {
            extra_capabilities.insert(entity.clone(), extra);
        }
    }

    Discrepancies {
        missing_entities,
        extra_entities,
        missing_capabilities,
        extra_capabilities,
    }
}

fn difference<'a>(
    entities: impl Iterator<Item = &'a EntityName>,
    present: impl Fn(&EntityName) -> bool,
) -> BTreeSet<EntityName> {
    entities.filter(|e| !present(e)).cloned().collect()
}

/// Capabilities `left` has on `entity` that `right` lacks.
fn capability_difference(
    left: &GraphModel,
    right: &GraphModel,
    entity: &EntityName,
) -> BTreeSet<Capability> {
    let Some(labels) = left.capabilities().get(entity.as_str()) else {
        return BTreeSet::new();
    };
    labels
        .iter()
        .filter(|label| !right.capabilities().has(entity.as_str(), label.as_str()))
        .cloned()
        .collect()
}
