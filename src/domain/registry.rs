//! Named strategy catalog.
//!
//! The engine never reaches for a global list of strategies; callers build a
//! registry and look descriptors up by name before running.

use crate::domain::error::TradesimError;
use crate::domain::strategy::StrategyDescriptor;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyDescriptor>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor under its own name, returning any it replaced.
    pub fn insert(&mut self, descriptor: StrategyDescriptor) -> Option<StrategyDescriptor> {
        self.strategies.insert(descriptor.name.clone(), descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&StrategyDescriptor> {
        self.strategies.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&StrategyDescriptor, TradesimError> {
        self.get(name).ok_or_else(|| TradesimError::UnknownStrategy {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl FromIterator<StrategyDescriptor> for StrategyRegistry {
    fn from_iter<I: IntoIterator<Item = StrategyDescriptor>>(iter: I) -> Self {
        let mut registry = StrategyRegistry::new();
        for descriptor in iter {
            registry.insert(descriptor);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorSpec;
    use crate::domain::predicate::Predicate;

    fn descriptor(name: &str) -> StrategyDescriptor {
        StrategyDescriptor::new(
            name,
            IndicatorSpec::new().sma(10),
            Predicate::expression("close > sma10"),
            Predicate::expression("close < sma10"),
        )
    }

    #[test]
    fn lookup_by_name() {
        let registry: StrategyRegistry =
            [descriptor("Trend"), descriptor("Momentum")].into_iter().collect();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("Trend").unwrap().name, "Trend");
        assert!(registry.get("Missing").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Momentum", "Trend"]);
    }

    #[test]
    fn require_reports_unknown_name() {
        let registry = StrategyRegistry::new();
        assert!(registry.is_empty());
        match registry.require("Nope") {
            Err(TradesimError::UnknownStrategy { name }) => assert_eq!(name, "Nope"),
            other => panic!("expected UnknownStrategy, got {:?}", other.map(|d| &d.name)),
        }
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut registry = StrategyRegistry::new();
        assert!(registry.insert(descriptor("Trend")).is_none());
        assert!(registry.insert(descriptor("Trend")).is_some());
        assert_eq!(registry.len(), 1);
    }
}
