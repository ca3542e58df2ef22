//! Composite-indicator aggregation engine.
//!
//! A project definition (IRI -> RI / SVI -> themes -> indicators) is
//! evaluated bottom-up against a feature table, one new result column per
//! composed level. See `compute::Recalculator` for the main entry point.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod store;
pub mod table;
pub mod telemetry;
pub mod transform;
pub mod zonal;

#[cfg(feature = "python")]
pub mod bindings;

pub use compute::{DiscardReason, DiscardedFeature, Engine, EngineError, Recalculation, Recalculator};
pub use config::EngineConfig;
pub use store::{DefinitionNode, Operator, OperatorRegistry};
pub use table::{FeatureTable, MemoryTable};

#[cfg(feature = "python")]
use pyo3::prelude::*;

// --- Module Definition ---
/// Defines the `svir._core` Python module.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use bindings::python;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_class::<python::PyFeatureTable>()?;
    m.add_function(wrap_pyfunction!(python::recalculate, m)?)?;
    m.add_function(wrap_pyfunction!(python::check_project, m)?)?;
    m.add_function(wrap_pyfunction!(python::assign_default_weights, m)?)?;
    m.add_function(wrap_pyfunction!(python::aggregate_losses, m)?)?;
    m.add_function(wrap_pyfunction!(python::default_project, m)?)?;
    m.add_function(wrap_pyfunction!(python::init_logging, m)?)?;
    Ok(())
}
