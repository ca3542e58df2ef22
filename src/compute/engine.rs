//! Bottom-up evaluation of a definition tree against a feature table.

use super::kernel;
use super::ledger::{ComputationError, DiscardLedger, DiscardReason, EngineError, Evaluation};
use super::naming;
use crate::analysis::feasibility;
use crate::config::EngineConfig;
use crate::store::{DefinitionNode, FeatureId, Operator, OperatorRegistry};
use crate::table::{Cell, EditSession, FeatureTable, TableError};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// `(value, weight)` pairs of one row. Nodes rarely have more than a handful of children.
type RowInputs = SmallVec<[(f64, f64); 8]>;

enum RowOutcome {
    Value(f64),
    Discard(DiscardReason),
}

#[derive(Default)]
struct Pass {
    added_fields: BTreeSet<String>,
    ledger: DiscardLedger,
}

pub struct Engine<'a> {
    registry: &'a OperatorRegistry,
    config: &'a EngineConfig,
}

impl<'a> Engine<'a> {
    pub fn new(registry: &'a OperatorRegistry, config: &'a EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Computes `node` and every descendant that has no result column yet.
    ///
    /// The caller's tree is never touched: the returned `Evaluation` carries an
    /// updated copy with `field` set on each computed node.
    pub fn evaluate<T: FeatureTable + ?Sized>(
        &self,
        node: &DefinitionNode,
        table: &mut T,
    ) -> Result<Evaluation, EngineError> {
        // 1. Feasibility gate. Nothing is written for a broken tree.
        let mut problems = Vec::new();
        if let Err(errors) = feasibility::check(node) {
            problems.extend(errors);
        }
        if let Err(errors) = feasibility::check_operators(node, self.registry) {
            problems.extend(errors);
        }
        if !problems.is_empty() {
            return Err(EngineError::Configuration(problems));
        }

        // 2. Post-order walk over a private copy.
        let mut evaluated = node.clone();
        let mut pass = Pass::default();
        if let Err(error) = self.evaluate_node(&mut evaluated, table, &mut pass) {
            return Err(EngineError::Computation { error, committed_fields: pass.added_fields });
        }

        Ok(Evaluation {
            added_fields: pass.added_fields,
            discarded: pass.ledger.into_set(),
            node: evaluated,
        })
    }

    fn evaluate_node<T: FeatureTable + ?Sized>(
        &self,
        node: &mut DefinitionNode,
        table: &mut T,
        pass: &mut Pass,
    ) -> Result<(), ComputationError> {
        if node.is_leaf() {
            return Ok(());
        }
        if let Some(field) = &node.field {
            debug!(node = %node.name, field = %field, "reusing computed column");
            return Ok(());
        }

        for child in node.children.iter_mut() {
            self.evaluate_node(child, table, pass)?;
        }

        let role = role_of(node);
        let base = naming::base_name(node, &self.config.theme_field_prefix);
        let field = naming::allocate_column(table, &base, self.config.max_field_name_len).map_err(|source| {
            ComputationError::ColumnAllocation { role: role.clone(), node_name: node.name.clone(), source }
        })?;

        match self.fill_column(node, &field, &role, table) {
            Ok(ledger) => {
                pass.ledger.merge(ledger);
                pass.added_fields.insert(field.clone());
                node.field = Some(field);
                Ok(())
            }
            Err(error) => {
                match table.delete_column(&field) {
                    Ok(()) => warn!(role = %role, field = %field, "removed partially written column"),
                    Err(e) => warn!(role = %role, field = %field, error = %e, "could not remove column"),
                }
                Err(error)
            }
        }
    }

    /// Computes every row of `node` and writes the results into `field` in
    /// one edit session. Returns the rows discarded by this node.
    fn fill_column<T: FeatureTable + ?Sized>(
        &self,
        node: &DefinitionNode,
        field: &str,
        role: &str,
        table: &mut T,
    ) -> Result<DiscardLedger, ComputationError> {
        let data_error = |source: TableError| ComputationError::DataType {
            role: role.to_string(),
            node_name: node.name.clone(),
            source,
        };

        let inputs = node
            .children
            .iter()
            .map(|child| {
                child.value_field().map(|f| (f, child.weight)).ok_or_else(|| ComputationError::MissingInput {
                    role: role.to_string(),
                    node_name: node.name.clone(),
                    child_name: child.name.clone(),
                })
            })
            .collect::<Result<Vec<(&str, f64)>, _>>()?;
        let op = self.registry.operator_for(node);

        let mut ledger = DiscardLedger::new();
        let mut results = Vec::new();
        for row in table.row_ids() {
            let cell = match read_row(&*table, row, op, &inputs).map_err(&data_error)? {
                RowOutcome::Value(v) => Cell::Number(v),
                RowOutcome::Discard(reason) => {
                    ledger.discard(row, reason);
                    Cell::Missing
                }
            };
            results.push((row, cell));
        }

        let mut session = EditSession::begin(table, format!("Add {}", role)).map_err(&data_error)?;
        for (row, cell) in results {
            session.set_cell(row, field, cell).map_err(&data_error)?;
        }
        session.commit().map_err(&data_error)?;

        info!(role = %role, node = %node.name, field = %field, operator = %op, "column written");
        if !ledger.is_empty() {
            warn!(role = %role, node = %node.name, discarded = ledger.len(), "features discarded");
        }
        Ok(ledger)
    }
}

fn role_of(node: &DefinitionNode) -> String {
    node.kind.role().unwrap_or("Theme").to_string()
}

/// Reads one row's inputs left to right and combines them.
///
/// The first missing or non-finite input discards the row; later inputs are
/// not read. A text cell is a data-type failure, not a discard.
fn read_row<T: FeatureTable + ?Sized>(
    table: &T,
    row: FeatureId,
    op: Operator,
    inputs: &[(&str, f64)],
) -> Result<RowOutcome, TableError> {
    let mut pairs = RowInputs::new();
    for &(field, weight) in inputs {
        match table.get_cell(row, field)? {
            Cell::Number(v) if v.is_finite() => pairs.push((v, weight)),
            Cell::Number(_) => return Ok(RowOutcome::Discard(DiscardReason::InvalidValue)),
            Cell::Missing => return Ok(RowOutcome::Discard(DiscardReason::MissingValue)),
            Cell::Text(_) => return Err(TableError::NonNumeric { field: field.to_string(), feature: row }),
        }
    }
    Ok(match kernel::combine(op, &pairs) {
        Ok(v) => RowOutcome::Value(v),
        Err(_) => RowOutcome::Discard(DiscardReason::InvalidValue),
    })
}
