//! Normalization algorithms over one numeric column.
//!
//! Each algorithm maps the present values of a column to new values.
//! Missing inputs stay missing. Inputs an algorithm cannot handle (a zero
//! under a logarithm, a non-finite number) become missing too and are
//! reported in `invalid_input_values`.

use super::TransformError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transformed {
    pub values: Vec<Option<f64>>,
    /// Inputs that could not be transformed, in row order.
    pub invalid_input_values: Vec<f64>,
}

/// Applies `f` to every present input. `f` returning `None` marks the input invalid.
fn map_values(input: &[Option<f64>], f: impl Fn(f64) -> Option<f64>) -> Transformed {
    let mut out = Transformed { values: Vec::with_capacity(input.len()), invalid_input_values: Vec::new() };
    for value in input {
        let mapped = match *value {
            None => None,
            Some(x) => match Some(x).filter(|x| x.is_finite()).and_then(&f).filter(|y| y.is_finite()) {
                Some(y) => Some(y),
                None => {
                    out.invalid_input_values.push(x);
                    None
                }
            },
        };
        out.values.push(mapped);
    }
    out
}

fn finite(input: &[Option<f64>]) -> impl Iterator<Item = f64> + '_ {
    input.iter().flatten().copied().filter(|x| x.is_finite())
}

/// `(min, max - min)` of the finite inputs. `None` when there are none.
fn range(algorithm: &'static str, input: &[Option<f64>]) -> Result<Option<(f64, f64)>, TransformError> {
    let (min, max) = finite(input).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
    if min > max {
        return Ok(None);
    }
    if max == min {
        return Err(TransformError::ConstantInput { algorithm });
    }
    Ok(Some((min, max - min)))
}

pub fn min_max(input: &[Option<f64>], _variant: Option<&str>, inverse: bool) -> Result<Transformed, TransformError> {
    let Some((min, span)) = range("MIN_MAX", input)? else {
        return Ok(map_values(input, Some));
    };
    let max = min + span;
    Ok(map_values(input, |x| Some(if inverse { (max - x) / span } else { (x - min) / span })))
}

/// Standard score with the population standard deviation.
pub fn z_score(input: &[Option<f64>], _variant: Option<&str>, inverse: bool) -> Result<Transformed, TransformError> {
    let n = finite(input).count();
    if n == 0 {
        return Ok(map_values(input, Some));
    }
    let mean = finite(input).sum::<f64>() / n as f64;
    let std = (finite(input).map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64).sqrt();
    if std == 0.0 {
        return Err(TransformError::ConstantInput { algorithm: "Z_SCORE" });
    }
    let sign = if inverse { -1.0 } else { 1.0 };
    Ok(map_values(input, |x| Some(sign * (x - mean) / std)))
}

/// 1-based ranks, ascending (descending with `inverse`). The variant picks
/// how ties are ranked.
pub fn rank(input: &[Option<f64>], variant: Option<&str>, inverse: bool) -> Result<Transformed, TransformError> {
    #[derive(Clone, Copy)]
    enum Ties {
        Average,
        Min,
        Max,
        Dense,
        Ordinal,
    }
    let ties = match variant.unwrap_or("AVERAGE") {
        "AVERAGE" => Ties::Average,
        "MIN" => Ties::Min,
        "MAX" => Ties::Max,
        "DENSE" => Ties::Dense,
        "ORDINAL" => Ties::Ordinal,
        other => return Err(TransformError::UnknownVariant { algorithm: "RANK", variant: other.to_string() }),
    };

    let mut out = map_values(input, Some);
    let values = std::mem::take(&mut out.values);
    let key = |i: usize| {
        let x = values[i].unwrap_or(0.0);
        if inverse { -x } else { x }
    };
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_some()).collect();
    // Stable sort: equal keys keep row order, which ORDINAL relies on.
    order.sort_by(|&a, &b| key(a).total_cmp(&key(b)));

    out.values = vec![None; values.len()];
    let mut start = 0;
    let mut group = 0;
    while start < order.len() {
        let end = start + order[start..].iter().take_while(|&&i| values[i] == values[order[start]]).count();
        group += 1;
        for (offset, &row) in order[start..end].iter().enumerate() {
            let r = match ties {
                Ties::Average => (start + 1 + end) as f64 / 2.0,
                Ties::Min => (start + 1) as f64,
                Ties::Max => end as f64,
                Ties::Dense => group as f64,
                Ties::Ordinal => (start + offset + 1) as f64,
            };
            out.values[row] = Some(r);
        }
        start = end;
    }
    Ok(out)
}

pub fn log10(input: &[Option<f64>], variant: Option<&str>, _inverse: bool) -> Result<Transformed, TransformError> {
    match variant.unwrap_or("INCREMENT BY ONE IF ZEROS ARE FOUND") {
        "IGNORE ZEROS" => Ok(map_values(input, |x| (x > 0.0).then(|| x.log10()))),
        "INCREMENT BY ONE IF ZEROS ARE FOUND" => {
            let shift = if finite(input).any(|x| x == 0.0) { 1.0 } else { 0.0 };
            Ok(map_values(input, |x| (x + shift > 0.0).then(|| (x + shift).log10())))
        }
        other => Err(TransformError::UnknownVariant { algorithm: "LOG10", variant: other.to_string() }),
    }
}

/// Squared min-max scaling. `inverse` flips the result to `1 - y`.
pub fn quadratic(input: &[Option<f64>], variant: Option<&str>, inverse: bool) -> Result<Transformed, TransformError> {
    let increasing = match variant.unwrap_or("INCREASING") {
        "INCREASING" => true,
        "DECREASING" => false,
        other => return Err(TransformError::UnknownVariant { algorithm: "QUADRATIC", variant: other.to_string() }),
    };
    let Some((min, span)) = range("QUADRATIC", input)? else {
        return Ok(map_values(input, Some));
    };
    let max = min + span;
    Ok(map_values(input, |x| {
        let scaled = if increasing { (x - min) / span } else { (max - x) / span };
        let y = scaled * scaled;
        Some(if inverse { 1.0 - y } else { y })
    }))
}

/// Logistic function; `inverse` applies the logit, defined on (0, 1) only.
pub fn sigmoid(input: &[Option<f64>], _variant: Option<&str>, inverse: bool) -> Result<Transformed, TransformError> {
    if inverse {
        Ok(map_values(input, |x| (x > 0.0 && x < 1.0).then(|| (x / (1.0 - x)).ln())))
    } else {
        Ok(map_values(input, |x| Some(1.0 / (1.0 + (-x).exp()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_min_max_and_inverse() {
        let input = vec![Some(2.0), None, Some(4.0), Some(6.0)];
        assert_eq!(min_max(&input, None, false).unwrap().values, vec![Some(0.0), None, Some(0.5), Some(1.0)]);
        assert_eq!(min_max(&input, None, true).unwrap().values, vec![Some(1.0), None, Some(0.5), Some(0.0)]);
    }

    #[test]
    fn test_constant_input_is_rejected() {
        let input = some(&[3.0, 3.0]);
        assert_eq!(min_max(&input, None, false), Err(TransformError::ConstantInput { algorithm: "MIN_MAX" }));
        assert_eq!(z_score(&input, None, false), Err(TransformError::ConstantInput { algorithm: "Z_SCORE" }));
    }

    #[test]
    fn test_z_score_uses_population_std() {
        let out = z_score(&some(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), None, false).unwrap();
        // mean 5, std 2
        assert_eq!(out.values[0], Some(-1.5));
        assert_eq!(out.values[7], Some(2.0));
    }

    #[rstest]
    #[case("AVERAGE", vec![1.0, 2.5, 2.5, 4.0])]
    #[case("MIN", vec![1.0, 2.0, 2.0, 4.0])]
    #[case("MAX", vec![1.0, 3.0, 3.0, 4.0])]
    #[case("DENSE", vec![1.0, 2.0, 2.0, 3.0])]
    #[case("ORDINAL", vec![1.0, 2.0, 3.0, 4.0])]
    fn test_rank_tie_variants(#[case] variant: &str, #[case] expected: Vec<f64>) {
        let out = rank(&some(&[10.0, 20.0, 20.0, 30.0]), Some(variant), false).unwrap();
        assert_eq!(out.values, some(&expected));
    }

    #[test]
    fn test_rank_inverse_and_missing() {
        let out = rank(&[Some(1.0), None, Some(3.0)], Some("MIN"), true).unwrap();
        assert_eq!(out.values, vec![Some(2.0), None, Some(1.0)]);
    }

    #[test]
    fn test_log10_variants() {
        let input = some(&[0.0, 9.0, 99.0]);
        let ignore = log10(&input, Some("IGNORE ZEROS"), false).unwrap();
        assert_eq!(ignore.values, vec![None, Some(9f64.log10()), Some(99f64.log10())]);
        assert_eq!(ignore.invalid_input_values, vec![0.0]);

        let shifted = log10(&input, Some("INCREMENT BY ONE IF ZEROS ARE FOUND"), false).unwrap();
        assert_eq!(shifted.values, vec![Some(0.0), Some(1.0), Some(2.0)]);
        assert!(shifted.invalid_input_values.is_empty());

        let negative = log10(&some(&[-1.0, 10.0]), Some("IGNORE ZEROS"), false).unwrap();
        assert_eq!(negative.invalid_input_values, vec![-1.0]);
    }

    #[test]
    fn test_quadratic() {
        let input = some(&[0.0, 5.0, 10.0]);
        assert_eq!(quadratic(&input, Some("INCREASING"), false).unwrap().values, some(&[0.0, 0.25, 1.0]));
        assert_eq!(quadratic(&input, Some("DECREASING"), false).unwrap().values, some(&[1.0, 0.25, 0.0]));
        assert_eq!(quadratic(&input, Some("INCREASING"), true).unwrap().values, some(&[1.0, 0.75, 0.0]));
    }

    #[test]
    fn test_sigmoid_and_logit() {
        assert_eq!(sigmoid(&some(&[0.0]), None, false).unwrap().values, vec![Some(0.5)]);
        let logit = sigmoid(&some(&[0.5, 1.0, -0.2]), None, true).unwrap();
        assert_eq!(logit.values, vec![Some(0.0), None, None]);
        assert_eq!(logit.invalid_input_values, vec![1.0, -0.2]);
    }

    #[test]
    fn test_non_finite_inputs_are_invalid() {
        let out = min_max(&[Some(f64::NAN), Some(1.0), Some(3.0)], None, false).unwrap();
        assert_eq!(out.values[0], None);
        assert!(out.invalid_input_values[0].is_nan());
        assert_eq!(out.values[2], Some(1.0));
    }
}
