//! The feature table the engine reads indicator data from and writes
//! composite results into.
//!
//! The table is an external collaborator; `FeatureTable` is the seam, and
//! `MemoryTable` is the in-crate implementation used by the bindings and tests.
pub mod memory;
pub mod session;

pub use memory::{ColumnStats, MemoryTable};
pub use session::EditSession;

use crate::store::FeatureId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One cell of the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Number(_) => "number",
            Cell::Text(_) => "text",
            Cell::Missing => "NULL",
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Missing, Cell::Number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Double,
    Integer,
    Text,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldType::Double => "double",
            FieldType::Integer => "integer",
            FieldType::Text => "text",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Field '{0}' already exists")]
    DuplicateField(String),
    #[error("Field '{0}' does not exist")]
    UnknownField(String),
    #[error("Feature {0} does not exist")]
    UnknownFeature(FeatureId),
    #[error("Field '{field}' of type {expected} cannot hold a {found} value")]
    TypeMismatch { field: String, expected: FieldType, found: &'static str },
    #[error("Field '{field}' holds non-numeric data for feature {feature}")]
    NonNumeric { field: String, feature: FeatureId },
    #[error("No free column name for '{base}' within {max_len} characters")]
    NoFreeName { base: String, max_len: usize },
    #[error("The table is not in an edit session")]
    NotEditing,
    #[error("The table is already in an edit session")]
    AlreadyEditing,
}

/// Read/extend access to a table of features.
pub trait FeatureTable {
    /// Feature ids in table order.
    fn row_ids(&self) -> Vec<FeatureId>;
    fn field_names(&self) -> Vec<String>;
    fn field_type(&self, field: &str) -> Option<FieldType>;
    fn get_cell(&self, row: FeatureId, field: &str) -> Result<Cell, TableError>;

    /// Creates an empty column. Fails with `DuplicateField` on a name collision.
    fn add_column(&mut self, name: &str, field_type: FieldType) -> Result<(), TableError>;
    fn delete_column(&mut self, name: &str) -> Result<(), TableError>;

    /// Writes one cell. Only valid inside an edit session.
    fn set_cell(&mut self, row: FeatureId, field: &str, value: Cell) -> Result<(), TableError>;

    /// Removes one feature. Only valid inside an edit session.
    fn delete_row(&mut self, row: FeatureId) -> Result<(), TableError>;

    fn begin_edit(&mut self) -> Result<(), TableError>;
    /// Ends the edit session and refreshes derived statistics.
    fn commit_edit(&mut self) -> Result<(), TableError>;
    fn is_editing(&self) -> bool;

    fn has_field(&self, field: &str) -> bool {
        self.field_type(field).is_some()
    }
}
