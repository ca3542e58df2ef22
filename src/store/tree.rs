//! tree.rs
//! The project definition: IRI -> {RI, SVI} -> themes -> indicators.
//!
//! Every edit clears the cached result `field` of the edited node and of all
//! its ancestors, so the next recalculation recomputes exactly the path that
//! changed and reuses every untouched column.

use super::types::{NodeKind, NodePath, Operator, SubIndexKind};
use super::weights;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("No node at path {0:?}")]
    InvalidPath(NodePath),
    #[error("Project definition has no {0} node")]
    MissingSubIndex(&'static str),
    #[error("Node '{0}' cannot hold children")]
    NotAContainer(String),
    #[error("The project root cannot be removed")]
    RootRemoval,
    #[error("Weight {0} is outside [0, 1]")]
    WeightOutOfRange(f64),
}

fn default_weight() -> f64 {
    1.0
}

/// A node of the project definition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    /// Column holding this node's computed result, once computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Indicator only: column holding the raw per-feature data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DefinitionNode>,
}

impl DefinitionNode {
    fn container(kind: NodeKind, name: impl Into<String>, weight: f64, operator: Option<Operator>) -> Self {
        Self {
            kind,
            name: name.into(),
            weight,
            operator,
            field: None,
            source_field: None,
            children: Vec::new(),
        }
    }

    pub fn indicator(name: impl Into<String>, source_field: impl Into<String>, weight: f64) -> Self {
        Self {
            source_field: Some(source_field.into()),
            ..Self::container(NodeKind::Indicator, name, weight, None)
        }
    }

    pub fn theme(name: impl Into<String>, weight: f64, operator: Option<Operator>) -> Self {
        Self::container(NodeKind::Theme, name, weight, operator)
    }

    pub fn risk_index(weight: f64, operator: Option<Operator>) -> Self {
        Self::container(NodeKind::SubIndex(SubIndexKind::Risk), "RI", weight, operator)
    }

    pub fn social_vulnerability_index(weight: f64, operator: Option<Operator>) -> Self {
        Self::container(NodeKind::SubIndex(SubIndexKind::SocialVulnerability), "SVI", weight, operator)
    }

    pub fn integrated_risk_index(operator: Option<Operator>) -> Self {
        Self::container(NodeKind::Composite, "IRI", 1.0, operator)
    }

    /// An empty project: IRI over an RI and an SVI with no indicators yet.
    pub fn project_template() -> Self {
        Self::integrated_risk_index(Some(Operator::default()))
            .with_child(Self::risk_index(0.5, Some(Operator::default())))
            .with_child(Self::social_vulnerability_index(0.5, Some(Operator::default())))
    }

    pub fn with_child(mut self, child: DefinitionNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Indicator
    }

    /// The column that holds this node's per-feature value, if any.
    pub fn value_field(&self) -> Option<&str> {
        match self.kind {
            NodeKind::Indicator => self.source_field.as_deref(),
            _ => self.field.as_deref(),
        }
    }

    // --- Navigation ---

    pub fn sub_index_position(&self, kind: SubIndexKind) -> Option<usize> {
        self.children.iter().position(|c| c.kind == NodeKind::SubIndex(kind))
    }

    pub fn sub_index(&self, kind: SubIndexKind) -> Option<&DefinitionNode> {
        self.sub_index_position(kind).map(|i| &self.children[i])
    }

    pub fn sub_index_mut(&mut self, kind: SubIndexKind) -> Option<&mut DefinitionNode> {
        self.sub_index_position(kind).map(move |i| &mut self.children[i])
    }

    pub fn risk(&self) -> Option<&DefinitionNode> {
        self.sub_index(SubIndexKind::Risk)
    }

    pub fn svi(&self) -> Option<&DefinitionNode> {
        self.sub_index(SubIndexKind::SocialVulnerability)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&DefinitionNode> {
        path.iter().try_fold(self, |node, &i| node.children.get(i))
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut DefinitionNode> {
        path.iter().try_fold(self, |node, &i| node.children.get_mut(i))
    }

    /// Walks `path`, clearing `field` on every node visited (root included),
    /// and returns the target node.
    fn invalidate_path(&mut self, path: &[usize]) -> Result<&mut DefinitionNode, EditError> {
        let mut node = self;
        node.field = None;
        for &i in path {
            node = node
                .children
                .get_mut(i)
                .ok_or_else(|| EditError::InvalidPath(path.to_vec()))?;
            node.field = None;
        }
        Ok(node)
    }

    // --- Edits ---

    /// Changes a node's weight. The node's own column stays valid; only the
    /// ancestors that combine it are invalidated.
    pub fn set_weight(&mut self, path: &[usize], weight: f64) -> Result<(), EditError> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(EditError::WeightOutOfRange(weight));
        }
        let (last, parent_path) = path.split_last().ok_or_else(|| EditError::InvalidPath(Vec::new()))?;
        if self.node_at(path).is_none() {
            return Err(EditError::InvalidPath(path.to_vec()));
        }
        let parent = self.invalidate_path(parent_path)?;
        parent.children[*last].weight = weight;
        Ok(())
    }

    /// Gives the children of the node at `path` equal default weights, then
    /// does the same for every group below them. When any weight changes,
    /// the node and its ancestors lose their columns.
    pub fn assign_default_weights(&mut self, path: &[usize], decimals: u32) -> Result<bool, EditError> {
        let node = self.node_at_mut(path).ok_or_else(|| EditError::InvalidPath(path.to_vec()))?;
        let changed = weights::assign_default_weights_with(&mut node.children, decimals);
        if changed {
            self.invalidate_path(path)?;
        }
        Ok(changed)
    }

    pub fn set_operator(&mut self, path: &[usize], operator: Operator) -> Result<(), EditError> {
        match self.node_at(path) {
            None => return Err(EditError::InvalidPath(path.to_vec())),
            Some(n) if n.is_leaf() => return Err(EditError::NotAContainer(n.name.clone())),
            Some(_) => {}
        }
        self.invalidate_path(path)?.operator = Some(operator);
        Ok(())
    }

    /// Appends `child` under the container at `path`, returning the new child's path.
    pub fn add_child(&mut self, path: &[usize], child: DefinitionNode) -> Result<NodePath, EditError> {
        match self.node_at(path) {
            None => return Err(EditError::InvalidPath(path.to_vec())),
            Some(n) if n.is_leaf() => return Err(EditError::NotAContainer(n.name.clone())),
            Some(_) => {}
        }
        let parent = self.invalidate_path(path)?;
        parent.children.push(child);
        let mut new_path = path.to_vec();
        new_path.push(parent.children.len() - 1);
        Ok(new_path)
    }

    pub fn remove_node(&mut self, path: &[usize]) -> Result<DefinitionNode, EditError> {
        let (last, parent_path) = path.split_last().ok_or(EditError::RootRemoval)?;
        if self.node_at(path).is_none() {
            return Err(EditError::InvalidPath(path.to_vec()));
        }
        let parent = self.invalidate_path(parent_path)?;
        Ok(parent.children.remove(*last))
    }

    /// Adds an indicator to the named SVI theme, creating the theme on first use.
    pub fn add_indicator_to_theme(
        &mut self,
        theme_name: &str,
        indicator_name: &str,
        source_field: &str,
    ) -> Result<NodePath, EditError> {
        let svi_pos = self
            .sub_index_position(SubIndexKind::SocialVulnerability)
            .ok_or(EditError::MissingSubIndex("SVI"))?;
        let existing = self.children[svi_pos].children.iter().position(|t| t.name == theme_name);
        let theme_pos = match existing {
            Some(pos) => pos,
            None => {
                let theme = DefinitionNode::theme(theme_name, 1.0, Some(Operator::default()));
                let theme_path = self.add_child(&[svi_pos], theme)?;
                theme_path[1]
            }
        };
        self.add_child(
            &[svi_pos, theme_pos],
            DefinitionNode::indicator(indicator_name, source_field, 1.0),
        )
    }

    pub fn add_risk_indicator(&mut self, indicator_name: &str, source_field: &str) -> Result<NodePath, EditError> {
        let ri_pos = self
            .sub_index_position(SubIndexKind::Risk)
            .ok_or(EditError::MissingSubIndex("RI"))?;
        self.add_child(&[ri_pos], DefinitionNode::indicator(indicator_name, source_field, 1.0))
    }

    /// Retargets every reference to column `old` (indicator sources and
    /// result fields) to column `new`. Returns how many references changed.
    pub fn replace_fields(&mut self, old: &str, new: &str) -> usize {
        let mut replaced = 0;
        for slot in [&mut self.field, &mut self.source_field] {
            if slot.as_deref() == Some(old) {
                *slot = Some(new.to_string());
                replaced += 1;
            }
        }
        replaced + self.children.iter_mut().map(|c| c.replace_fields(old, new)).sum::<usize>()
    }

    /// Depth-first iterator over `(path, node)` pairs, parents before children.
    pub fn walk(&self) -> Vec<(NodePath, &DefinitionNode)> {
        let mut out = Vec::new();
        let mut stack = vec![(Vec::new(), self)];
        while let Some((path, node)) = stack.pop() {
            for (i, child) in node.children.iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(i);
                stack.push((child_path, child));
            }
            out.push((path, node));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn computed_project() -> DefinitionNode {
        let mut project = DefinitionNode::project_template();
        project.add_risk_indicator("AAL", "aal").unwrap();
        project.add_indicator_to_theme("Population", "Density", "dens").unwrap();
        project.children[0].field = Some("RI".into());
        project.children[1].field = Some("SVI".into());
        project.children[1].children[0].field = Some("Population".into());
        project.field = Some("IRI".into());
        project
    }

    #[test]
    fn test_template_shape() {
        let project = DefinitionNode::project_template();
        assert_eq!(project.kind, NodeKind::Composite);
        assert_eq!(project.sub_index_position(SubIndexKind::Risk), Some(0));
        assert_eq!(project.sub_index_position(SubIndexKind::SocialVulnerability), Some(1));
        assert!(project.svi().unwrap().children.is_empty());
    }

    #[test]
    fn test_add_indicator_creates_theme_once() {
        let mut project = DefinitionNode::project_template();
        assert_eq!(project.add_indicator_to_theme("Education", "Illiteracy", "illit").unwrap(), vec![1, 0, 0]);
        assert_eq!(project.add_indicator_to_theme("Education", "Dropouts", "drop").unwrap(), vec![1, 0, 1]);
        assert_eq!(project.add_indicator_to_theme("Health", "Beds", "beds").unwrap(), vec![1, 1, 0]);
        assert_eq!(project.svi().unwrap().children.len(), 2);
    }

    #[test]
    fn test_adding_theme_invalidates_svi_path_only() {
        let mut project = computed_project();
        project.add_indicator_to_theme("Economy", "Income", "inc").unwrap();
        assert_eq!(project.field, None);
        assert_eq!(project.svi().unwrap().field, None);
        assert_eq!(project.risk().unwrap().field.as_deref(), Some("RI"));
        // The untouched theme keeps its column.
        assert_eq!(project.children[1].children[0].field.as_deref(), Some("Population"));
    }

    #[test]
    fn test_set_weight_keeps_own_field() {
        let mut project = computed_project();
        project.set_weight(&[1, 0], 0.3).unwrap();
        assert_eq!(project.children[1].children[0].field.as_deref(), Some("Population"));
        assert_eq!(project.children[1].field, None);
        assert_eq!(project.field, None);
        assert!(matches!(project.set_weight(&[1, 0], 1.5), Err(EditError::WeightOutOfRange(_))));
    }

    #[test]
    fn test_default_weights_invalidate_the_reweighted_path() {
        let mut project = computed_project();
        project.add_indicator_to_theme("Population", "Elderly", "old").unwrap();
        project.children[1].children[0].field = Some("Population".into());
        project.children[1].field = Some("SVI".into());
        project.field = Some("IRI".into());

        // Population's two indicators drop from 1.0 to 0.5 each.
        assert_eq!(project.assign_default_weights(&[1], 2), Ok(true));
        assert!(project.children[1].children[0].children.iter().all(|i| i.weight == 0.5));
        assert_eq!(project.children[1].children[0].field, None);
        assert_eq!(project.children[1].field, None);
        assert_eq!(project.field, None);
        assert_eq!(project.risk().unwrap().field.as_deref(), Some("RI"));
        assert!(matches!(project.assign_default_weights(&[4], 2), Err(EditError::InvalidPath(_))));
    }

    #[test]
    fn test_default_weights_keep_columns_when_nothing_changes() {
        let mut project = computed_project();
        project.assign_default_weights(&[1], 2).unwrap();
        project.children[1].field = Some("SVI".into());
        project.field = Some("IRI".into());

        assert_eq!(project.assign_default_weights(&[1], 2), Ok(false));
        assert_eq!(project.svi().unwrap().field.as_deref(), Some("SVI"));
        assert_eq!(project.field.as_deref(), Some("IRI"));
    }

    #[test]
    fn test_set_operator_rejects_leaves() {
        let mut project = computed_project();
        assert!(matches!(
            project.set_operator(&[0, 0], Operator::Average),
            Err(EditError::NotAContainer(_))
        ));
        project.set_operator(&[0], Operator::Average).unwrap();
        assert_eq!(project.risk().unwrap().operator, Some(Operator::Average));
        assert_eq!(project.risk().unwrap().field, None);
    }

    #[test]
    fn test_remove_node() {
        let mut project = computed_project();
        let removed = project.remove_node(&[1, 0]).unwrap();
        assert_eq!(removed.name, "Population");
        assert!(project.svi().unwrap().children.is_empty());
        assert_eq!(project.remove_node(&[]), Err(EditError::RootRemoval));
        assert!(matches!(project.remove_node(&[5]), Err(EditError::InvalidPath(_))));
    }

    #[test]
    fn test_replace_fields_counts_references() {
        let mut project = computed_project();
        project.add_risk_indicator("AAL again", "aal").unwrap();
        assert_eq!(project.replace_fields("aal", "T_aal"), 2);
        assert!(project.risk().unwrap().children.iter().all(|c| c.source_field.as_deref() == Some("T_aal")));
    }

    #[test]
    fn test_walk_is_preorder() {
        let project = computed_project();
        let paths: Vec<NodePath> = project.walk().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec![vec![], vec![0], vec![0, 0], vec![1], vec![1, 0], vec![1, 0, 0]]);
    }

    #[test]
    fn test_json_shape_omits_empty_members() {
        let leaf = DefinitionNode::indicator("Density", "dens", 0.5);
        let json = serde_json::to_value(&leaf).unwrap();
        assert_eq!(json["kind"], "indicator");
        assert_eq!(json["source_field"], "dens");
        assert!(json.get("children").is_none());
        assert!(json.get("field").is_none());

        let svi: DefinitionNode = serde_json::from_str(r#"{"kind": {"sub_index": "SVI"}, "name": "SVI"}"#).unwrap();
        assert_eq!(svi.kind, NodeKind::SubIndex(SubIndexKind::SocialVulnerability));
        assert_eq!(svi.weight, 1.0);
    }
}
