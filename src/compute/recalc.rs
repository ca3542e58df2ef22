//! recalc.rs
//! Entry point for a user-triggered recomputation of a whole project.
//!
//! Decides which subtrees to hand to the engine, runs them, and splices the
//! evaluated copies back into a copy of the project.

use super::engine::Engine;
use super::ledger::{DiscardedFeature, EngineError};
use crate::analysis::feasibility;
use crate::config::EngineConfig;
use crate::store::{DefinitionNode, NodePath, OperatorRegistry, SubIndexKind};
use crate::table::FeatureTable;
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalcState {
    Idle,
    CheckFeasibility,
    Evaluate,
    Merge,
}

/// Outcome of one recalculation.
#[derive(Debug, Clone, PartialEq)]
pub struct Recalculation {
    pub added_fields: BTreeSet<String>,
    pub discarded: BTreeSet<DiscardedFeature>,
    /// The project with every freshly computed `field` filled in.
    pub project: DefinitionNode,
}

impl Recalculation {
    fn unchanged(project: &DefinitionNode) -> Self {
        Self { added_fields: BTreeSet::new(), discarded: BTreeSet::new(), project: project.clone() }
    }
}

pub struct Recalculator<'a> {
    engine: Engine<'a>,
    state: RecalcState,
}

impl<'a> Recalculator<'a> {
    pub fn new(registry: &'a OperatorRegistry, config: &'a EngineConfig) -> Self {
        Self { engine: Engine::new(registry, config), state: RecalcState::Idle }
    }

    pub fn state(&self) -> RecalcState {
        self.state
    }

    fn transition(&mut self, next: RecalcState) {
        debug!(from = ?self.state, to = ?next, "recalculation state");
        self.state = next;
    }

    /// Recomputes whatever `project` allows.
    ///
    /// With a computable IRI only the IRI is evaluated; its RI and SVI are
    /// computed on the way. Otherwise the SVI and the RI are evaluated on
    /// their own, each only if computable. A project where nothing is
    /// computable comes back unchanged with empty result sets.
    ///
    /// On a `Computation` error, `committed_fields` lists every column kept
    /// in the table, including those of a sub-index finished earlier.
    pub fn recalculate<T: FeatureTable + ?Sized>(
        &mut self,
        project: &DefinitionNode,
        table: &mut T,
    ) -> Result<Recalculation, EngineError> {
        self.transition(RecalcState::CheckFeasibility);
        let result = self.run(project, table);
        self.transition(RecalcState::Idle);
        result
    }

    fn run<T: FeatureTable + ?Sized>(
        &mut self,
        project: &DefinitionNode,
        table: &mut T,
    ) -> Result<Recalculation, EngineError> {
        let targets = entry_points(project);
        if targets.is_empty() {
            info!("nothing to compute");
            return Ok(Recalculation::unchanged(project));
        }

        self.transition(RecalcState::Evaluate);
        let mut added_fields = BTreeSet::new();
        let mut discarded = BTreeSet::new();
        let mut evaluated = Vec::with_capacity(targets.len());

        for path in targets {
            let Some(node) = project.node_at(&path) else { continue };
            match self.engine.evaluate(node, table) {
                Ok(evaluation) => {
                    added_fields.extend(evaluation.added_fields);
                    discarded.extend(evaluation.discarded);
                    evaluated.push((path, evaluation.node));
                }
                Err(EngineError::Computation { error, committed_fields }) => {
                    added_fields.extend(committed_fields);
                    return Err(EngineError::Computation { error, committed_fields: added_fields });
                }
                Err(other) => return Err(other),
            }
        }

        self.transition(RecalcState::Merge);
        let mut merged = project.clone();
        for (path, node) in evaluated {
            splice(&mut merged, &path, node);
        }

        info!(added = added_fields.len(), discarded = discarded.len(), "recalculation done");
        Ok(Recalculation { added_fields, discarded, project: merged })
    }
}

/// Paths of the subtrees to evaluate, SVI before RI when the IRI is not computable.
fn entry_points(project: &DefinitionNode) -> Vec<NodePath> {
    if feasibility::is_iri_computable(project) {
        return vec![Vec::new()];
    }
    [SubIndexKind::SocialVulnerability, SubIndexKind::Risk]
        .into_iter()
        .filter_map(|kind| {
            let pos = project.sub_index_position(kind)?;
            feasibility::is_computable(&project.children[pos]).then(|| vec![pos])
        })
        .collect()
}

fn splice(root: &mut DefinitionNode, path: &[usize], node: DefinitionNode) {
    let mut slot = root;
    for &i in path {
        match slot.children.get_mut(i) {
            Some(child) => slot = child,
            None => return,
        }
    }
    *slot = node;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Operator;
    use crate::table::MemoryTable;

    fn registry_and_config() -> (OperatorRegistry, EngineConfig) {
        let config = EngineConfig::default();
        (config.registry(), config)
    }

    #[test]
    fn test_nothing_computable_is_a_noop() {
        let (registry, config) = registry_and_config();
        let mut recalc = Recalculator::new(&registry, &config);
        let project = DefinitionNode::project_template();
        let mut table = MemoryTable::with_rows(3);

        let result = recalc.recalculate(&project, &mut table).unwrap();
        assert_eq!(result, Recalculation::unchanged(&project));
        assert_eq!(recalc.state(), RecalcState::Idle);
        assert!(table.field_names().is_empty());
    }

    #[test]
    fn test_only_ri_computable() {
        let (registry, config) = registry_and_config();
        let mut recalc = Recalculator::new(&registry, &config);
        let mut project = DefinitionNode::project_template();
        project.add_risk_indicator("Loss", "loss").unwrap();
        let mut table = MemoryTable::with_rows(1);
        table.add_numeric_column("loss", vec![Some(4.0)]).unwrap();

        let result = recalc.recalculate(&project, &mut table).unwrap();
        assert_eq!(result.added_fields, BTreeSet::from(["RI".to_string()]));
        assert_eq!(result.project.risk().unwrap().field.as_deref(), Some("RI"));
        assert_eq!(result.project.field, None);
        assert_eq!(result.project.svi(), project.svi());
    }

    #[test]
    fn test_iri_average_scenario() {
        let (registry, config) = registry_and_config();
        let mut recalc = Recalculator::new(&registry, &config);
        let mut project = DefinitionNode::project_template();
        project.set_operator(&[], Operator::Average).unwrap();
        project.add_risk_indicator("Loss", "loss").unwrap();
        project.add_indicator_to_theme("Population", "Density", "dens").unwrap();
        let mut table = MemoryTable::with_rows(1);
        table.add_numeric_column("loss", vec![Some(4.0)]).unwrap();
        table.add_numeric_column("dens", vec![Some(10.0)]).unwrap();

        let result = recalc.recalculate(&project, &mut table).unwrap();
        assert_eq!(table.numeric_values("IRI").unwrap(), vec![Some(7.0)]);
        assert_eq!(result.project.field.as_deref(), Some("IRI"));
        assert_eq!(result.added_fields.len(), 4);
        assert!(result.discarded.is_empty());
    }

    #[test]
    fn test_failure_reports_columns_committed_earlier() {
        let (registry, config) = registry_and_config();
        let mut recalc = Recalculator::new(&registry, &config);
        let mut project = DefinitionNode::project_template();
        project.add_indicator_to_theme("Population", "Density", "dens").unwrap();
        project.add_risk_indicator("Loss", "loss").unwrap();
        // SVI first, so it is committed before the RI fails.
        project.children.swap(0, 1);
        let mut table = MemoryTable::with_rows(1);
        table.add_numeric_column("dens", vec![Some(10.0)]).unwrap();
        table.add_text_column("loss", vec!["n/a"]).unwrap();

        let err = recalc.recalculate(&project, &mut table).unwrap_err();
        match err {
            EngineError::Computation { error, committed_fields } => {
                assert_eq!(error.role(), "RI");
                assert!(committed_fields.contains("SVI"));
                assert!(committed_fields.contains("Population"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(recalc.state(), RecalcState::Idle);
        assert!(!table.has_field("RI"));
    }
}
