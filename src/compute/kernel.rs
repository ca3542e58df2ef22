use crate::store::Operator;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum KernelError {
    /// No inputs to combine (an average over zero children).
    #[error("Undefined result: nothing to combine")]
    Undefined,
    /// The result is outside the operator's domain or not finite.
    #[error("Invalid result for {0}")]
    Invalid(Operator),
}

/// Combines `(value, weight)` pairs with one operator.
///
/// Accumulation is strictly left to right in input order, sums from 0.0 and
/// products from 1.0, so two equivalent inputs always produce bit-identical
/// results.
#[inline]
pub fn combine(op: Operator, inputs: &[(f64, f64)]) -> Result<f64, KernelError> {
    if inputs.is_empty() {
        return Err(KernelError::Undefined);
    }
    let result = match op {
        Operator::SumSimple => inputs.iter().fold(0.0, |acc, &(v, _)| acc + v),
        Operator::SumWeighted => inputs.iter().fold(0.0, |acc, &(v, w)| acc + v * w),
        Operator::MulSimple => inputs.iter().fold(1.0, |acc, &(v, _)| acc * v),
        Operator::MulWeighted => inputs.iter().fold(1.0, |acc, &(v, w)| acc * (v * w)),
        Operator::Average => inputs.iter().fold(0.0, |acc, &(v, _)| acc + v) / inputs.len() as f64,
        Operator::GeometricMean => {
            let product = inputs.iter().fold(1.0, |acc: f64, &(v, _)| acc * v);
            if product < 0.0 {
                return Err(KernelError::Invalid(op));
            }
            product.powf(1.0 / inputs.len() as f64)
        }
    };
    if result.is_finite() {
        Ok(result)
    } else {
        Err(KernelError::Invalid(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const INPUTS: [(f64, f64); 3] = [(2.0, 0.5), (4.0, 0.25), (8.0, 0.25)];

    #[rstest]
    #[case(Operator::SumSimple, 14.0)]
    #[case(Operator::SumWeighted, 1.0 + 1.0 + 2.0)]
    #[case(Operator::MulSimple, 64.0)]
    #[case(Operator::MulWeighted, 1.0 * 1.0 * 2.0)]
    #[case(Operator::Average, 14.0 / 3.0)]
    #[case(Operator::GeometricMean, 4.0)]
    fn test_operator_semantics(#[case] op: Operator, #[case] expected: f64) {
        let got = combine(op, &INPUTS).unwrap();
        assert!((got - expected).abs() < 1e-12, "{:?}: {} != {}", op, got, expected);
    }

    #[rstest]
    #[case(Operator::SumSimple)]
    #[case(Operator::SumWeighted)]
    #[case(Operator::MulSimple)]
    #[case(Operator::MulWeighted)]
    #[case(Operator::Average)]
    #[case(Operator::GeometricMean)]
    fn test_empty_input_is_undefined(#[case] op: Operator) {
        assert_eq!(combine(op, &[]), Err(KernelError::Undefined));
    }

    #[test]
    fn test_average_ignores_weights() {
        let a = combine(Operator::Average, &[(4.0, 1.0), (10.0, 0.0)]).unwrap();
        let b = combine(Operator::Average, &[(4.0, 0.3), (10.0, 0.7)]).unwrap();
        assert_eq!(a, 7.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_simple_operators_never_apply_weights() {
        // Equal explicit weights must not leak into the simple rules.
        let inputs = [(3.0, 0.5), (5.0, 0.5)];
        assert_eq!(combine(Operator::SumSimple, &inputs).unwrap(), 8.0);
        assert_eq!(combine(Operator::MulSimple, &inputs).unwrap(), 15.0);
        assert_eq!(combine(Operator::SumWeighted, &inputs).unwrap(), 4.0);
    }

    #[test]
    fn test_equal_weights_match_average() {
        let values = [1.5, 2.25, 7.0, 11.125];
        let w = 1.0 / values.len() as f64;
        let weighted: Vec<(f64, f64)> = values.iter().map(|&v| (v, w)).collect();
        let avg = combine(Operator::Average, &weighted).unwrap();
        let sum_w = combine(Operator::SumWeighted, &weighted).unwrap();
        assert!((avg - sum_w).abs() < 1e-12);
    }

    #[test]
    fn test_geometric_mean_domain() {
        assert_eq!(
            combine(Operator::GeometricMean, &[(-2.0, 1.0), (8.0, 1.0)]),
            Err(KernelError::Invalid(Operator::GeometricMean))
        );
        // An even number of negatives gives a positive product.
        let got = combine(Operator::GeometricMean, &[(-2.0, 1.0), (-8.0, 1.0)]).unwrap();
        assert!((got - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_overflow_is_invalid() {
        assert_eq!(
            combine(Operator::MulSimple, &[(f64::MAX, 1.0), (10.0, 1.0)]),
            Err(KernelError::Invalid(Operator::MulSimple))
        );
    }
}
