//! ledger.rs
//! Per-pass bookkeeping: which features were discarded and why, and the
//! error types an evaluation pass can end with.

use crate::analysis::feasibility::ConfigurationError;
use crate::store::{DefinitionNode, FeatureId};
use crate::table::TableError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

pub use self::error::{ComputationError, EngineError};
mod error {
    use super::*;

    /// A fatal, node-level failure. The column created for the failing node
    /// has already been removed when this error is returned.
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum ComputationError {
        #[error("Could not calculate {role} '{node_name}' due to data problems: {source}")]
        DataType { role: String, node_name: String, source: TableError },
        #[error("{role} '{node_name}' reads from child '{child_name}', which has no result column")]
        MissingInput { role: String, node_name: String, child_name: String },
        #[error("Could not add a result column for {role} '{node_name}': {source}")]
        ColumnAllocation { role: String, node_name: String, source: TableError },
    }

    impl ComputationError {
        pub fn role(&self) -> &str {
            match self {
                ComputationError::DataType { role, .. }
                | ComputationError::MissingInput { role, .. }
                | ComputationError::ColumnAllocation { role, .. } => role,
            }
        }
    }

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum EngineError {
        /// The tree failed the feasibility checks; nothing was evaluated.
        #[error("Project definition is not computable ({} problem(s)): {}", .0.len(), summarize(.0))]
        Configuration(Vec<ConfigurationError>),
        /// A node failed. Columns committed for earlier nodes in the same
        /// pass are kept and listed in `committed_fields`.
        #[error("{error}")]
        Computation { error: ComputationError, committed_fields: BTreeSet<String> },
    }

    fn summarize(errors: &[ConfigurationError]) -> String {
        errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiscardReason {
    MissingValue,
    InvalidValue,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiscardReason::MissingValue => "Missing value",
            DiscardReason::InvalidValue => "Invalid value",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscardedFeature {
    pub feature_id: FeatureId,
    pub reason: DiscardReason,
}

/// Discards recorded during one evaluation pass.
///
/// The first reason recorded for a feature wins: a feature dropped as
/// invalid by a theme is not re-reported as missing by the SVI that reads
/// the theme's (now empty) cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscardLedger {
    entries: BTreeMap<FeatureId, DiscardReason>,
}

impl DiscardLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discard(&mut self, feature_id: FeatureId, reason: DiscardReason) {
        self.entries.entry(feature_id).or_insert(reason);
    }

    pub fn contains(&self, feature_id: FeatureId) -> bool {
        self.entries.contains_key(&feature_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn merge(&mut self, other: DiscardLedger) {
        for (id, reason) in other.entries {
            self.discard(id, reason);
        }
    }

    pub fn into_set(self) -> BTreeSet<DiscardedFeature> {
        self.entries
            .into_iter()
            .map(|(feature_id, reason)| DiscardedFeature { feature_id, reason })
            .collect()
    }
}

/// Outcome of one successful evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Columns created during the pass.
    pub added_fields: BTreeSet<String>,
    pub discarded: BTreeSet<DiscardedFeature>,
    /// The evaluated copy of the input node, with `field` set on every computed node.
    pub node: DefinitionNode,
}
