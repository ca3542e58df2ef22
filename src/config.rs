//! Engine settings.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields a working configuration.

use crate::store::weights::DEFAULT_WEIGHT_DECIMALS;
use crate::store::{DefinitionNode, EditError, Operator, OperatorRegistry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read configuration file {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("max_field_name_len must be at least {min}, got {got}")]
    FieldNameTooShort { min: usize, got: usize },
}

/// Shortest accepted column-name limit: one character plus a `_N` suffix.
pub const MIN_FIELD_NAME_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Operator used by composite nodes that do not set one.
    pub default_operator: Operator,
    /// Decimals kept by the default weight assignment.
    pub weight_decimals: u32,
    /// Upper bound on generated column names (10 matches shapefile attribute names).
    pub max_field_name_len: Option<usize>,
    /// Prepended to column names derived from theme names.
    pub theme_field_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_operator: Operator::default(),
            weight_decimals: DEFAULT_WEIGHT_DECIMALS,
            max_field_name_len: None,
            theme_field_prefix: String::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.max_field_name_len {
            Some(got) if got < MIN_FIELD_NAME_LEN => Err(ConfigError::FieldNameTooShort { min: MIN_FIELD_NAME_LEN, got }),
            _ => Ok(()),
        }
    }

    /// The operator registry for this configuration: every built-in operator,
    /// with `default_operator` as the fallback.
    pub fn registry(&self) -> OperatorRegistry {
        OperatorRegistry::with_builtin(self.default_operator)
    }

    /// Equal default weights below the node at `path`, rounded to
    /// `weight_decimals`. Returns whether any weight changed.
    pub fn assign_default_weights(&self, project: &mut DefinitionNode, path: &[usize]) -> Result<bool, EditError> {
        project.assign_default_weights(path, self.weight_decimals)
    }
}
