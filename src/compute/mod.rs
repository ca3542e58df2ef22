//! Evaluates definition trees into feature-table columns.
pub mod engine;
pub mod kernel;
pub mod ledger;
pub mod naming;
pub mod recalc;

pub use engine::Engine;
pub use ledger::{ComputationError, DiscardReason, DiscardedFeature, EngineError, Evaluation};
pub use recalc::{RecalcState, Recalculation, Recalculator};
