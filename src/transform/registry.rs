//! The set of normalization algorithms available to `transform_attribute`.

use super::algorithms::{self, Transformed};
use super::TransformError;
use std::fmt;

pub type TransformFn = fn(&[Option<f64>], Option<&str>, bool) -> Result<Transformed, TransformError>;

/// One registered algorithm and the options it accepts.
#[derive(Clone, Copy)]
pub struct Algorithm {
    pub name: &'static str,
    /// Accepted variants; the first one is used when none is given.
    pub variants: &'static [&'static str],
    pub supports_inverse: bool,
    apply: TransformFn,
}

impl fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Algorithm")
            .field("name", &self.name)
            .field("variants", &self.variants)
            .field("supports_inverse", &self.supports_inverse)
            .finish()
    }
}

impl Algorithm {
    pub fn new(
        name: &'static str,
        variants: &'static [&'static str],
        supports_inverse: bool,
        apply: TransformFn,
    ) -> Self {
        Self { name, variants, supports_inverse, apply }
    }

    /// Checks the options, then runs the algorithm.
    pub fn apply(&self, input: &[Option<f64>], variant: Option<&str>, inverse: bool) -> Result<Transformed, TransformError> {
        if inverse && !self.supports_inverse {
            return Err(TransformError::InverseNotSupported(self.name));
        }
        let variant = match variant.filter(|v| !v.is_empty()) {
            Some(v) if !self.variants.iter().any(|&known| known == v) => {
                return Err(TransformError::UnknownVariant { algorithm: self.name, variant: v.to_string() })
            }
            Some(v) => Some(v),
            None => self.variants.first().copied(),
        };
        (self.apply)(input, variant, inverse)
    }
}

pub fn builtin() -> [Algorithm; 6] {
    [
        Algorithm::new("MIN_MAX", &[], true, algorithms::min_max),
        Algorithm::new("Z_SCORE", &[], true, algorithms::z_score),
        Algorithm::new("RANK", &["AVERAGE", "MIN", "MAX", "DENSE", "ORDINAL"], true, algorithms::rank),
        Algorithm::new("LOG10", &["INCREMENT BY ONE IF ZEROS ARE FOUND", "IGNORE ZEROS"], false, algorithms::log10),
        Algorithm::new("QUADRATIC", &["INCREASING", "DECREASING"], true, algorithms::quadratic),
        Algorithm::new("SIGMOID", &[], true, algorithms::sigmoid),
    ]
}

/// Algorithms by name, in registration order.
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    entries: Vec<Algorithm>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for algorithm in builtin() {
            registry.register(algorithm);
        }
        registry
    }

    /// Adds `algorithm`, replacing any entry with the same name in place.
    pub fn register(&mut self, algorithm: Algorithm) -> &mut Self {
        match self.entries.iter_mut().find(|a| a.name == algorithm.name) {
            Some(slot) => *slot = algorithm,
            None => self.entries.push(algorithm),
        }
        self
    }

    pub fn get(&self, name: &str) -> Result<&Algorithm, TransformError> {
        self.entries
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| TransformError::UnknownAlgorithm(name.to_string()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|a| a.name).collect()
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_in_order() {
        assert_eq!(
            AlgorithmRegistry::default().names(),
            vec!["MIN_MAX", "Z_SCORE", "RANK", "LOG10", "QUADRATIC", "SIGMOID"]
        );
    }

    #[test]
    fn test_option_checks() {
        let registry = AlgorithmRegistry::default();
        let log10 = registry.get("LOG10").unwrap();
        assert_eq!(log10.apply(&[Some(10.0)], None, true), Err(TransformError::InverseNotSupported("LOG10")));
        assert!(matches!(
            registry.get("RANK").unwrap().apply(&[Some(1.0)], Some("MEDIAN"), false),
            Err(TransformError::UnknownVariant { algorithm: "RANK", .. })
        ));
        assert!(matches!(registry.get("BOX_COX"), Err(TransformError::UnknownAlgorithm(_))));
    }

    #[test]
    fn test_default_variant_is_first() {
        let registry = AlgorithmRegistry::default();
        // LOG10 defaults to shifting when zeros are present.
        let out = registry.get("LOG10").unwrap().apply(&[Some(0.0), Some(9.0)], None, false).unwrap();
        assert_eq!(out.values, vec![Some(0.0), Some(1.0)]);
    }

    fn halve(input: &[Option<f64>], _: Option<&str>, _: bool) -> Result<Transformed, TransformError> {
        Ok(Transformed { values: input.iter().map(|v| v.map(|x| x / 2.0)).collect(), invalid_input_values: Vec::new() })
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut registry = AlgorithmRegistry::default();
        registry.register(Algorithm::new("MIN_MAX", &[], false, halve));
        assert_eq!(registry.names().len(), 6);
        let out = registry.get("MIN_MAX").unwrap().apply(&[Some(4.0)], None, false).unwrap();
        assert_eq!(out.values, vec![Some(2.0)]);
    }
}
