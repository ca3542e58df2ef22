use crate::analysis::feasibility;
use crate::compute::{EngineError, Recalculator};
use crate::config::EngineConfig;
use crate::display::trace;
use crate::store::{DefinitionNode, FeatureId, SubIndexKind};
use crate::table::{FeatureTable, MemoryTable};
use crate::telemetry;
use crate::transform::{self, AlgorithmRegistry};
use crate::zonal::{self, LossAggregation};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn parse_project(project_json: &str) -> PyResult<DefinitionNode> {
    serde_json::from_str(project_json).map_err(|e| PyValueError::new_err(format!("Malformed project definition: {}", e)))
}

fn parse_config(config_json: Option<&str>) -> PyResult<EngineConfig> {
    match config_json {
        Some(text) => EngineConfig::from_json(text).map_err(|e| PyValueError::new_err(e.to_string())),
        None => Ok(EngineConfig::default()),
    }
}

#[pyclass(name = "_FeatureTable")]
#[derive(Debug, Clone, Default)]
pub struct PyFeatureTable {
    pub inner: MemoryTable,
}

#[pymethods]
impl PyFeatureTable {
    #[new]
    pub fn new(feature_ids: Vec<FeatureId>) -> Self {
        Self { inner: MemoryTable::new(feature_ids) }
    }

    pub fn add_numeric_column(&mut self, name: &str, values: Vec<Option<f64>>) -> PyResult<()> {
        self.inner.add_numeric_column(name, values).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    pub fn add_text_column(&mut self, name: &str, values: Vec<String>) -> PyResult<()> {
        let values: Vec<&str> = values.iter().map(String::as_str).collect();
        self.inner.add_text_column(name, values).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    pub fn values(&self, name: &str) -> PyResult<Vec<Option<f64>>> {
        self.inner.numeric_values(name).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    pub fn field_names(&self) -> Vec<String> {
        self.inner.field_names()
    }

    #[pyo3(signature = (input, algorithm, target, variant=None, inverse=false))]
    pub fn transform(
        &mut self,
        input: &str,
        algorithm: &str,
        target: &str,
        variant: Option<&str>,
        inverse: bool,
    ) -> PyResult<(String, Vec<f64>)> {
        let registry = AlgorithmRegistry::default();
        transform::transform_attribute(&mut self.inner, &registry, input, algorithm, variant, inverse, target)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    pub fn trace_feature(&self, project_json: &str, feature: FeatureId) -> PyResult<String> {
        let project = parse_project(project_json)?;
        Ok(trace::format_trace(&project, &EngineConfig::default().registry(), &self.inner, feature))
    }
}

/// Recomputes a project against `table`.
///
/// Returns `(added_fields, discarded, project_json)` where `discarded` holds
/// `(feature_id, reason)` pairs.
#[pyfunction]
#[pyo3(signature = (project_json, table, config_json=None))]
pub fn recalculate(
    project_json: &str,
    table: &mut PyFeatureTable,
    config_json: Option<&str>,
) -> PyResult<(Vec<String>, Vec<(FeatureId, String)>, String)> {
    let project = parse_project(project_json)?;
    let config = parse_config(config_json)?;
    let registry = config.registry();

    let result = Recalculator::new(&registry, &config)
        .recalculate(&project, &mut table.inner)
        .map_err(|e| match e {
            EngineError::Configuration(_) => PyValueError::new_err(e.to_string()),
            EngineError::Computation { .. } => PyRuntimeError::new_err(e.to_string()),
        })?;

    let project_json = serde_json::to_string(&result.project).map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    let discarded = result.discarded.iter().map(|d| (d.feature_id, d.reason.to_string())).collect();
    Ok((result.added_fields.into_iter().collect(), discarded, project_json))
}

#[pyfunction]
pub fn check_project(project_json: &str) -> PyResult<()> {
    let project = parse_project(project_json)?;
    feasibility::check(&project).map_err(|errs| {
        let msg = errs.iter().map(|e| format!("{}: {}", e.node_name, e.message)).collect::<Vec<_>>().join("\n");
        PyValueError::new_err(msg)
    })
}

/// Spreads weights equally over the SVI themes and, within each theme, its indicators.
#[pyfunction]
#[pyo3(signature = (project_json, config_json=None))]
pub fn assign_default_weights(project_json: &str, config_json: Option<&str>) -> PyResult<String> {
    let mut project = parse_project(project_json)?;
    let config = parse_config(config_json)?;
    let svi = project
        .sub_index_position(SubIndexKind::SocialVulnerability)
        .ok_or_else(|| PyValueError::new_err("Project definition has no SVI node"))?;
    config
        .assign_default_weights(&mut project, &[svi])
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    serde_json::to_string(&project).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

/// Writes per-zone loss count, sum and average columns into `zones`.
///
/// Returns `(count_field, [(loss_field, sum_field, avg_field)], purged_zone_ids)`.
#[pyfunction]
#[pyo3(signature = (losses, zones, loss_fields, loss_zone_field, zone_id_field, purge=false, config_json=None))]
pub fn aggregate_losses(
    losses: &PyFeatureTable,
    zones: &mut PyFeatureTable,
    loss_fields: Vec<String>,
    loss_zone_field: String,
    zone_id_field: String,
    purge: bool,
    config_json: Option<&str>,
) -> PyResult<(String, Vec<(String, String, String)>, Vec<FeatureId>)> {
    let config = parse_config(config_json)?;
    let request = LossAggregation { loss_fields, loss_zone_field, zone_id_field, purge_empty_zones: purge };
    let stats = zonal::aggregate_losses(&losses.inner, &mut zones.inner, &request, &config)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let columns = stats.loss_columns.into_iter().map(|c| (c.loss_field, c.sum_field, c.avg_field)).collect();
    Ok((stats.count_field, columns, stats.purged_zones))
}

#[pyfunction]
pub fn default_project() -> PyResult<String> {
    serde_json::to_string(&DefinitionNode::project_template()).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

#[pyfunction]
#[pyo3(signature = (filter="info"))]
pub fn init_logging(filter: &str) -> PyResult<()> {
    telemetry::init(filter).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}
