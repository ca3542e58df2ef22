//! Default equal-weight distribution over sibling nodes.
//!
//! Each weight is rounded to a fixed number of decimals. The rounded weights
//! of a sibling group may sum to slightly more or less than 1.0 (three
//! siblings get 0.33 each); that drift is kept, since correcting it would
//! silently change every index computed from those weights.

use super::tree::DefinitionNode;

pub const DEFAULT_WEIGHT_DECIMALS: u32 = 2;

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Splits 1.0 equally across `siblings`, then recurses into each sibling's
/// own children as an independent group.
///
/// Clears the cached `field` of every sibling whose subtree was reweighted.
/// Returns whether any weight in the group changed; the caller owns the
/// parent, whose column is stale in that case.
pub fn assign_default_weights(siblings: &mut [DefinitionNode]) -> bool {
    assign_default_weights_with(siblings, DEFAULT_WEIGHT_DECIMALS)
}

pub fn assign_default_weights_with(siblings: &mut [DefinitionNode], decimals: u32) -> bool {
    if siblings.is_empty() {
        return false;
    }
    let weight = round_to(1.0 / siblings.len() as f64, decimals);
    let mut changed = false;
    for node in siblings.iter_mut() {
        if node.weight != weight {
            node.weight = weight;
            changed = true;
        }
        if assign_default_weights_with(&mut node.children, decimals) {
            node.field = None;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Operator;
    use rstest::rstest;

    fn themes(indicators_per_theme: &[usize]) -> Vec<DefinitionNode> {
        indicators_per_theme
            .iter()
            .enumerate()
            .map(|(t, &count)| {
                (0..count).fold(
                    DefinitionNode::theme(format!("T{}", t), 0.0, Some(Operator::SumWeighted)),
                    |theme, i| theme.with_child(DefinitionNode::indicator(format!("I{}", i), format!("f{}_{}", t, i), 0.0)),
                )
            })
            .collect()
    }

    #[rstest]
    #[case(1, 1.0)]
    #[case(2, 0.5)]
    #[case(3, 0.33)]
    #[case(6, 0.17)]
    #[case(7, 0.14)]
    fn test_equal_split_is_rounded(#[case] count: usize, #[case] expected: f64) {
        let mut siblings = themes(&vec![0; count]);
        assign_default_weights(&mut siblings);
        assert!(siblings.iter().all(|t| t.weight == expected));
    }

    #[test]
    fn test_three_siblings_sum_within_tolerance() {
        let mut siblings = themes(&[1, 1, 1]);
        assign_default_weights(&mut siblings);
        let total: f64 = siblings.iter().map(|t| t.weight).sum();
        assert!((total - 1.0).abs() <= 0.01 + 1e-12, "total = {}", total);
        assert!(siblings.iter().all(|t| round_to(t.weight, 2) == t.weight));
    }

    #[test]
    fn test_each_group_is_split_independently() {
        let mut siblings = themes(&[2, 3]);
        assign_default_weights(&mut siblings);
        assert_eq!(siblings[0].weight, 0.5);
        assert!(siblings[0].children.iter().all(|i| i.weight == 0.5));
        assert!(siblings[1].children.iter().all(|i| i.weight == 0.33));
    }

    #[test]
    fn test_reweighted_subtrees_lose_their_columns() {
        let mut siblings = themes(&[2, 2]);
        assign_default_weights(&mut siblings);
        siblings[0].field = Some("T0".into());
        siblings[1].field = Some("T1".into());
        siblings[1].children[0].weight = 1.0;

        assert!(assign_default_weights(&mut siblings));
        assert_eq!(siblings[0].field.as_deref(), Some("T0"));
        assert_eq!(siblings[1].field, None);
        assert_eq!(siblings[1].children[0].weight, 0.5);

        // Weights already at their defaults leave everything in place.
        siblings[1].field = Some("T1".into());
        assert!(!assign_default_weights(&mut siblings));
        assert_eq!(siblings[1].field.as_deref(), Some("T1"));
    }

    #[test]
    fn test_drift_is_not_corrected() {
        let mut siblings = themes(&[0; 6]);
        assign_default_weights(&mut siblings);
        let total: f64 = siblings.iter().map(|t| t.weight).sum();
        assert!(total > 1.0);
    }
}
