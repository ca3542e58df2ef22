use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of one feature (row) in a feature table.
pub type FeatureId = u64;

/// Index path from the project root down to a node (`[1, 0]` = first theme of the SVI).
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubIndexKind {
    #[serde(rename = "RI")]
    Risk,
    #[serde(rename = "SVI")]
    SocialVulnerability,
}

impl SubIndexKind {
    pub fn role(&self) -> &'static str {
        match self {
            SubIndexKind::Risk => "RI",
            SubIndexKind::SocialVulnerability => "SVI",
        }
    }
}

/// The position a node occupies in the project hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A leaf pointing at a raw data column.
    Indicator,
    /// A named group of indicators under the SVI.
    Theme,
    SubIndex(SubIndexKind),
    /// The Integrated Risk Index, root of a project definition.
    Composite,
}

impl NodeKind {
    /// Fixed column base name for the roles that have one; themes derive theirs from the node name.
    pub fn role(&self) -> Option<&'static str> {
        match self {
            NodeKind::Composite => Some("IRI"),
            NodeKind::SubIndex(kind) => Some(kind.role()),
            NodeKind::Theme | NodeKind::Indicator => None,
        }
    }
}

/// A combination rule applied to the children of a composite node.
///
/// Simple and weighted variants are deliberately separate rules: a weighted
/// operator multiplies each value by its weight, a simple one never touches
/// the weight, even when every sibling carries the same weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "Sum (simple)")]
    SumSimple,
    #[serde(rename = "Sum (weighted)")]
    SumWeighted,
    #[serde(rename = "Multiplication (simple)")]
    MulSimple,
    #[serde(rename = "Multiplication (weighted)")]
    MulWeighted,
    #[serde(rename = "Average (equal weights)")]
    Average,
    #[serde(rename = "Geometric mean (equal weights)")]
    GeometricMean,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::SumSimple,
        Operator::SumWeighted,
        Operator::MulSimple,
        Operator::MulWeighted,
        Operator::Average,
        Operator::GeometricMean,
    ];

    /// The label shown to users and stored in project definition documents.
    pub fn label(&self) -> &'static str {
        match self {
            Operator::SumSimple => "Sum (simple)",
            Operator::SumWeighted => "Sum (weighted)",
            Operator::MulSimple => "Multiplication (simple)",
            Operator::MulWeighted => "Multiplication (weighted)",
            Operator::Average => "Average (equal weights)",
            Operator::GeometricMean => "Geometric mean (equal weights)",
        }
    }

    pub fn uses_weights(&self) -> bool {
        matches!(self, Operator::SumWeighted | Operator::MulWeighted)
    }
}

impl Default for Operator {
    fn default() -> Self {
        Operator::SumWeighted
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_labels_round_trip_through_json() {
        for op in Operator::ALL {
            let json = serde_json::to_string(&op).unwrap();
            assert_eq!(json, format!("\"{}\"", op.label()));
            let back: Operator = serde_json::from_str(&json).unwrap();
            assert_eq!(back, op);
        }
    }

    #[test]
    fn test_roles() {
        assert_eq!(NodeKind::Composite.role(), Some("IRI"));
        assert_eq!(NodeKind::SubIndex(SubIndexKind::Risk).role(), Some("RI"));
        assert_eq!(NodeKind::SubIndex(SubIndexKind::SocialVulnerability).role(), Some("SVI"));
        assert_eq!(NodeKind::Theme.role(), None);
    }
}
