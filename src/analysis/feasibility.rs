//! Structural predicates deciding whether a (sub-)index can be computed, and
//! whether it can be rendered from an existing column.
//!
//! All checks are pure and look only at the definition tree. They are meant
//! to run after every structural edit and before any evaluation starts, so a
//! configuration problem is never discovered halfway through a pass.

use crate::store::{DefinitionNode, NodeKind, NodePath, OperatorRegistry, SubIndexKind};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationErrorType {
    /// The project root lacks its RI or SVI node.
    MissingSubIndex,
    /// A container node has no children.
    EmptyContainer,
    /// A node sits where the hierarchy does not allow it (e.g. a theme under the RI).
    MisplacedNode,
    /// An indicator has no source column.
    MissingSourceField,
    /// A node uses an operator that is not in the registry.
    UnregisteredOperator,
}

/// A structured report of one structural problem.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{node_name}: {message}")]
pub struct ConfigurationError {
    pub path: NodePath,
    pub node_name: String,
    pub error_type: ConfigurationErrorType,
    pub message: String,
}

impl ConfigurationError {
    fn new(path: &[usize], node: &DefinitionNode, error_type: ConfigurationErrorType, message: impl Into<String>) -> Self {
        Self { path: path.to_vec(), node_name: node.name.clone(), error_type, message: message.into() }
    }
}

// --- Predicates ---

fn is_usable_indicator(node: &DefinitionNode) -> bool {
    node.kind == NodeKind::Indicator && node.source_field.as_deref().map_or(false, |f| !f.is_empty())
}

/// Computability of any node, dispatched on its kind.
pub fn is_computable(node: &DefinitionNode) -> bool {
    match node.kind {
        NodeKind::Indicator => is_usable_indicator(node),
        NodeKind::Theme | NodeKind::SubIndex(SubIndexKind::Risk) => {
            !node.children.is_empty() && node.children.iter().all(is_usable_indicator)
        }
        NodeKind::SubIndex(SubIndexKind::SocialVulnerability) => {
            !node.children.is_empty()
                && node.children.iter().all(|theme| theme.kind == NodeKind::Theme && is_computable(theme))
        }
        NodeKind::Composite => is_ri_computable(node) && is_svi_computable(node),
    }
}

pub fn is_renderable(node: &DefinitionNode) -> bool {
    is_computable(node) && node.field.is_some()
}

/// True iff the project's SVI has at least one theme and every theme has at least one indicator.
pub fn is_svi_computable(project: &DefinitionNode) -> bool {
    project.svi().map_or(false, is_computable)
}

/// True iff the project's RI has at least one indicator.
pub fn is_ri_computable(project: &DefinitionNode) -> bool {
    project.risk().map_or(false, is_computable)
}

pub fn is_iri_computable(project: &DefinitionNode) -> bool {
    project.kind == NodeKind::Composite && is_ri_computable(project) && is_svi_computable(project)
}

pub fn is_svi_renderable(project: &DefinitionNode) -> bool {
    project.svi().map_or(false, is_renderable)
}

pub fn is_ri_renderable(project: &DefinitionNode) -> bool {
    project.risk().map_or(false, is_renderable)
}

pub fn is_iri_renderable(project: &DefinitionNode) -> bool {
    is_iri_computable(project) && project.field.is_some()
}

// --- Full report ---

/// Collects every structural problem below `node`, like a linter.
///
/// # Returns
/// - `Ok(())` when `node` is computable.
/// - `Err(Vec<ConfigurationError>)` with every problem found.
pub fn check(node: &DefinitionNode) -> Result<(), Vec<ConfigurationError>> {
    let mut errors = Vec::new();
    check_node(node, &mut Vec::new(), &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Reports composite nodes whose operator is missing from `registry`.
pub fn check_operators(node: &DefinitionNode, registry: &OperatorRegistry) -> Result<(), Vec<ConfigurationError>> {
    let errors: Vec<ConfigurationError> = node
        .walk()
        .into_iter()
        .filter(|(_, n)| !n.is_leaf() && !registry.is_registered(registry.operator_for(n)))
        .map(|(path, n)| {
            ConfigurationError::new(
                &path,
                n,
                ConfigurationErrorType::UnregisteredOperator,
                format!("Operator '{}' is not available", registry.operator_for(n)),
            )
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_node(node: &DefinitionNode, path: &mut NodePath, errors: &mut Vec<ConfigurationError>) {
    use ConfigurationErrorType::*;

    let allowed_child = |child: &DefinitionNode| match node.kind {
        NodeKind::Composite => matches!(child.kind, NodeKind::SubIndex(_)),
        NodeKind::SubIndex(SubIndexKind::SocialVulnerability) => child.kind == NodeKind::Theme,
        NodeKind::SubIndex(SubIndexKind::Risk) | NodeKind::Theme => child.kind == NodeKind::Indicator,
        NodeKind::Indicator => false,
    };

    match node.kind {
        NodeKind::Indicator => {
            if !is_usable_indicator(node) {
                errors.push(ConfigurationError::new(path, node, MissingSourceField, "Indicator has no source field"));
            }
            return;
        }
        NodeKind::Composite => {
            for kind in [SubIndexKind::Risk, SubIndexKind::SocialVulnerability] {
                if node.sub_index(kind).is_none() {
                    errors.push(ConfigurationError::new(
                        path,
                        node,
                        MissingSubIndex,
                        format!("Project definition has no {} node", kind.role()),
                    ));
                }
            }
        }
        _ if node.children.is_empty() => {
            let what = if node.kind == NodeKind::SubIndex(SubIndexKind::SocialVulnerability) { "theme" } else { "indicator" };
            errors.push(ConfigurationError::new(path, node, EmptyContainer, format!("At least one {} is required", what)));
        }
        _ => {}
    }

    for (i, child) in node.children.iter().enumerate() {
        path.push(i);
        if allowed_child(child) {
            check_node(child, path, errors);
        } else {
            errors.push(ConfigurationError::new(
                path,
                child,
                MisplacedNode,
                format!("A {:?} node cannot be a child of '{}'", child.kind, node.name),
            ));
        }
        path.pop();
    }
}
