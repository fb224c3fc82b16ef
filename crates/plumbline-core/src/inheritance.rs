//! Inheritance resolution over a capability map.
//!
//! An [`InheritanceFact`] says that a child entity receives every capability
//! of its parent. Facts are resolved together after all declarations are
//! known, repeating until no capability is added. Union is idempotent, so
//! cycles and repeated facts terminate.

use log::debug;

use crate::model::{CapabilityMap, EntityName, GraphModel};

/// A deferred instruction to union a parent's capabilities into a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InheritanceFact {
    child: EntityName,
    parent: EntityName,
}

impl InheritanceFact {
    pub fn new(child: EntityName, parent: EntityName) -> Self {
        Self { child, parent }
    }

    pub fn child(&self) -> &EntityName {
        &self.child
    }

    pub fn parent(&self) -> &EntityName {
        &self.parent
    }
}

/// Propagates capabilities along `facts` until a fixpoint is reached.
///
/// Returns the total number of labels added. Facts whose parent has no entry
/// in `capabilities` are skipped.
pub fn resolve(capabilities: &mut CapabilityMap, facts: &[InheritanceFact]) -> usize {
    let mut added = 0;
    let mut rounds = 0;
    loop {
        rounds += 1;
        let round: usize = facts
            .iter()
            .map(|fact| capabilities.union_from(&fact.child, &fact.parent))
            .sum();
        if round == 0 {
            break;
        }
        added += round;
    }
    debug!(facts = facts.len(), rounds, added; "Inheritance resolved");
    added
}

/// Resolves `facts` in place on a graph model's capability map.
pub fn resolve_model(model: &mut GraphModel, facts: &[InheritanceFact]) -> usize {
    resolve(model.capabilities_mut(), facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Capability;

    fn fact(child: &str, parent: &str) -> InheritanceFact {
        InheritanceFact::new(child.into(), parent.into())
    }

    #[test]
    fn test_multi_level_chain() {
        let mut map = CapabilityMap::new();
        map.insert(&"Animal".into(), Capability::method("speak"));
        map.insert(&"Dog".into(), Capability::method("bark"));
        map.ensure(&"Puppy".into());

        // Child listed before its parent is resolved still gets everything.
        resolve(&mut map, &[fact("Puppy", "Dog"), fact("Dog", "Animal")]);

        assert!(map.has("Puppy", "speak()"));
        assert!(map.has("Puppy", "bark()"));
        assert!(map.has("Dog", "speak()"));
        assert!(!map.has("Animal", "bark()"));
    }

    #[test]
    fn test_cycle_terminates() {
        let mut map = CapabilityMap::new();
        map.insert(&"A".into(), "a()".into());
        map.insert(&"B".into(), "b()".into());

        resolve(&mut map, &[fact("A", "B"), fact("B", "A")]);

        assert!(map.has("A", "b()"));
        assert!(map.has("B", "a()"));
        assert_eq!(map.get("A").map(|caps| caps.len()), Some(2));
    }

    #[test]
    fn test_unknown_parent_skipped() {
        let mut map = CapabilityMap::new();
        map.insert(&"Dog".into(), "bark()".into());

        assert_eq!(resolve(&mut map, &[fact("Dog", "Missing")]), 0);
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;
    use crate::model::Capability;

    const NAMES: [&str; 5] = ["A", "B", "C", "D", "E"];

    fn capability_map_strategy() -> impl Strategy<Value = CapabilityMap> {
        prop::collection::vec((0..NAMES.len(), "[a-d]"), 0..12).prop_map(|pairs| {
            let mut map = CapabilityMap::new();
            for name in NAMES {
                map.ensure(&name.into());
            }
            for (index, label) in pairs {
                map.insert(&NAMES[index].into(), Capability::method(&label));
            }
            map
        })
    }

    fn facts_strategy() -> impl Strategy<Value = Vec<InheritanceFact>> {
        prop::collection::vec((0..NAMES.len(), 0..NAMES.len()), 0..10).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(child, parent)| InheritanceFact::new(NAMES[child].into(), NAMES[parent].into()))
                .collect()
        })
    }

    /// A second resolution over a resolved map never adds anything.
    fn check_resolution_is_idempotent(
        mut map: CapabilityMap,
        facts: &[InheritanceFact],
    ) -> Result<(), TestCaseError> {
        resolve(&mut map, facts);
        let resolved = map.clone();

        prop_assert_eq!(resolve(&mut map, facts), 0);
        prop_assert_eq!(map, resolved);
        Ok(())
    }

    /// After resolution every child holds all of its parent's capabilities.
    fn check_children_cover_parents(
        mut map: CapabilityMap,
        facts: &[InheritanceFact],
    ) -> Result<(), TestCaseError> {
        resolve(&mut map, facts);

        for fact in facts {
            let parent = map.get(fact.parent().as_str()).cloned().unwrap_or_default();
            for capability in parent {
                prop_assert!(map.has(fact.child().as_str(), capability.as_str()));
            }
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn resolution_is_idempotent(map in capability_map_strategy(), facts in facts_strategy()) {
            check_resolution_is_idempotent(map, &facts)?;
        }

        #[test]
        fn children_cover_parents(map in capability_map_strategy(), facts in facts_strategy()) {
            check_children_cover_parents(map, &facts)?;
        }
    }
}
