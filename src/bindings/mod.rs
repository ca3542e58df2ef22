//! Python facade, built with the `python` feature.
pub mod python;
