//! Normalization of raw indicator columns before they enter a project.
pub mod algorithms;
pub mod registry;

pub use algorithms::Transformed;
pub use registry::{Algorithm, AlgorithmRegistry};

use crate::compute::naming;
use crate::table::{Cell, EditSession, FeatureTable, FieldType, TableError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Unknown transformation algorithm '{0}'")]
    UnknownAlgorithm(String),
    #[error("Algorithm {algorithm} has no variant '{variant}'")]
    UnknownVariant { algorithm: &'static str, variant: String },
    #[error("Algorithm {0} has no inverse")]
    InverseNotSupported(&'static str),
    #[error("Algorithm {algorithm} cannot scale a column whose values are all equal")]
    ConstantInput { algorithm: &'static str },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Transforms column `input` with a registered algorithm.
///
/// When `target` equals `input` the column is overwritten in place (it must
/// be a double column). Otherwise the result goes to a new double column
/// named `target`, suffixed if that name is taken.
///
/// # Returns
/// The name of the column holding the result, and the input values that
/// could not be transformed (their result cells are left missing).
pub fn transform_attribute<T: FeatureTable + ?Sized>(
    table: &mut T,
    registry: &AlgorithmRegistry,
    input: &str,
    algorithm: &str,
    variant: Option<&str>,
    inverse: bool,
    target: &str,
) -> Result<(String, Vec<f64>), TransformError> {
    let algorithm = registry.get(algorithm)?;

    // 1. Read the input column.
    let rows = table.row_ids();
    let mut values = Vec::with_capacity(rows.len());
    for &row in &rows {
        values.push(match table.get_cell(row, input)? {
            Cell::Number(v) => Some(v),
            Cell::Missing => None,
            Cell::Text(_) => return Err(TableError::NonNumeric { field: input.to_string(), feature: row }.into()),
        });
    }

    // 2. Transform before touching the table, so option errors leave it unchanged.
    let transformed = algorithm.apply(&values, variant, inverse)?;

    // 3. Resolve the target column.
    let field = if target == input {
        match table.field_type(input) {
            Some(FieldType::Double) => input.to_string(),
            Some(other) => {
                return Err(TableError::TypeMismatch { field: input.to_string(), expected: other, found: "number" }.into())
            }
            None => return Err(TableError::UnknownField(input.to_string()).into()),
        }
    } else {
        naming::allocate_column(table, target, None)?
    };

    // 4. Write every row in one session.
    let mut session = EditSession::begin(table, format!("Transform {}", input))?;
    for (&row, value) in rows.iter().zip(transformed.values) {
        session.set_cell(row, &field, Cell::from(value))?;
    }
    session.commit()?;

    if transformed.invalid_input_values.is_empty() {
        info!(algorithm = algorithm.name, input = %input, field = %field, "transformation applied");
    } else {
        warn!(
            algorithm = algorithm.name,
            input = %input,
            field = %field,
            invalid = transformed.invalid_input_values.len(),
            "transformation applied with invalid inputs"
        );
    }
    Ok((field, transformed.invalid_input_values))
}
