//! The project definition model: node types, the tree, default weights and
//! the operator registry.
pub mod registry;
pub mod tree;
pub mod types;
pub mod weights;

pub use registry::OperatorRegistry;
pub use tree::{DefinitionNode, EditError};
pub use types::{FeatureId, NodeKind, NodePath, Operator, SubIndexKind};
pub use weights::assign_default_weights;
