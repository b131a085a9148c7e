//! Holds check definitions for lookup by name and ordered iteration.
//!
//! Registering a name that already exists replaces the earlier definition in
//! place. Replacement is the supported way to override a stock check, so it is
//! neither an error nor a warning; the replaced check keeps its original slot
//! so run order does not depend on which registration came last.

use crate::registry::definition::CheckDefinition;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
/// In-memory store for check definitions in registration order.
pub struct CheckRegistry {
    definitions: Vec<CheckDefinition>,
    by_name: BTreeMap<String, usize>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition, or replace the one already registered under its name.
    pub fn register(&mut self, definition: CheckDefinition) {
        match self.by_name.get(&definition.name) {
            Some(&slot) => {
                tracing::debug!(check = %definition.name, "replacing registered check");
                self.definitions[slot] = definition;
            }
            None => {
                self.by_name
                    .insert(definition.name.clone(), self.definitions.len());
                self.definitions.push(definition);
            }
        }
    }

    /// Fetch a definition by name, if present.
    pub fn get(&self, name: &str) -> Option<&CheckDefinition> {
        self.by_name.get(name).map(|&slot| &self.definitions[slot])
    }

    /// Iterates definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CheckDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_registration_order() {
        let mut registry = CheckRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(CheckDefinition::new(name));
        }
        let names: Vec<_> = registry.iter().map(|def| def.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn re_registering_replaces_in_place() {
        let mut registry = CheckRegistry::new();
        registry.register(CheckDefinition::new("x").category("First"));
        registry.register(CheckDefinition::new("y"));
        registry.register(CheckDefinition::new("x").category("Second"));

        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.iter().map(|def| def.name.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
        assert_eq!(registry.get("x").map(|def| def.category.as_str()), Some("Second"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn empty_registry_reports_empty() {
        let registry = CheckRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.iter().count(), 0);
    }
}
