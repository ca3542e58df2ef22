//! Static checks over a definition tree.
pub mod feasibility;

pub use feasibility::{ConfigurationError, ConfigurationErrorType};
