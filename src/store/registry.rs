//! The set of combination rules a project may use.
//!
//! Built once (usually from `EngineConfig`) and handed to the engine by
//! reference; there is no process-wide table of operators.

use super::tree::DefinitionNode;
use super::types::Operator;

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorRegistry {
    entries: Vec<Operator>,
    default_operator: Operator,
}

impl OperatorRegistry {
    /// An empty registry that only knows its default operator.
    pub fn new(default_operator: Operator) -> Self {
        Self { entries: vec![default_operator], default_operator }
    }

    /// A registry holding every built-in operator.
    pub fn with_builtin(default_operator: Operator) -> Self {
        let mut registry = Self::new(default_operator);
        for op in Operator::ALL {
            registry.register(op);
        }
        registry
    }

    pub fn register(&mut self, op: Operator) -> &mut Self {
        if !self.entries.contains(&op) {
            self.entries.push(op);
        }
        self
    }

    pub fn is_registered(&self, op: Operator) -> bool {
        self.entries.contains(&op)
    }

    pub fn default_operator(&self) -> Operator {
        self.default_operator
    }

    /// Looks an operator up by its user-facing label.
    pub fn resolve(&self, label: &str) -> Option<Operator> {
        self.entries.iter().copied().find(|op| op.label() == label)
    }

    /// Registered operators in registration order.
    pub fn operators(&self) -> &[Operator] {
        &self.entries
    }

    /// The operator a composite node combines its children with.
    pub fn operator_for(&self, node: &DefinitionNode) -> Operator {
        node.operator.unwrap_or(self.default_operator)
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_builtin(Operator::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_operator_falls_back_to_default() {
        let registry = OperatorRegistry::default();
        let theme = DefinitionNode::theme("Education", 1.0, None);
        assert_eq!(registry.operator_for(&theme), Operator::SumWeighted);

        let registry = OperatorRegistry::with_builtin(Operator::Average);
        assert_eq!(registry.operator_for(&theme), Operator::Average);
    }

    #[test]
    fn test_restricted_registry() {
        let mut registry = OperatorRegistry::new(Operator::SumWeighted);
        registry.register(Operator::Average);
        assert!(registry.is_registered(Operator::Average));
        assert!(!registry.is_registered(Operator::GeometricMean));
        assert_eq!(registry.resolve("Average (equal weights)"), Some(Operator::Average));
        assert_eq!(registry.resolve("Multiplication (simple)"), None);
        assert_eq!(registry.operators(), &[Operator::SumWeighted, Operator::Average]);
    }
}
