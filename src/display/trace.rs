use crate::store::{DefinitionNode, FeatureId, NodeKind, Operator, OperatorRegistry};
use crate::table::{Cell, FeatureTable};
use std::fmt::Write;

/// Renders how one feature's value was built up through `root`.
///
/// ```text
/// AUDIT TRACE for feature 0 in 'IRI':
/// --------------------------------------------------
/// [L1] IRI[7.000] = avg(RI[4.000], SVI[10.000])
/// |--[L2] RI[4.000] = 1.00*Loss[4.000]
/// |  `--[L3] Loss[4.000] -> Var(loss)
/// `--[L2] SVI[10.000] = 1.00*Population[10.000]
/// ...
/// ```
pub fn format_trace<T: FeatureTable + ?Sized>(
    root: &DefinitionNode,
    registry: &OperatorRegistry,
    table: &T,
    feature: FeatureId,
) -> String {
    let mut tracer = Tracer { registry, table, feature, output: String::new() };

    if table.row_ids().contains(&feature) {
        let _ = writeln!(tracer.output, "AUDIT TRACE for feature {} in '{}':", feature, root.name);
        let _ = writeln!(tracer.output, "--------------------------------------------------");
        tracer.trace_node(root, 1, "");
    } else {
        let _ = writeln!(tracer.output, "Error: Invalid feature ID {}", feature);
    }
    tracer.output
}

struct Tracer<'a, T: FeatureTable + ?Sized> {
    registry: &'a OperatorRegistry,
    table: &'a T,
    feature: FeatureId,
    output: String,
}

impl<'a, T: FeatureTable + ?Sized> Tracer<'a, T> {
    fn trace_node(&mut self, node: &DefinitionNode, level: usize, prefix: &str) {
        let line_header = format!("[L{}] {}{}", level, node.name, self.format_value(node));

        match node.kind {
            NodeKind::Indicator => {
                let source = node.source_field.as_deref().unwrap_or("?");
                let _ = writeln!(self.output, "{}{} -> Var({})", prefix, line_header, source);
            }
            _ if node.field.is_none() => {
                let _ = writeln!(self.output, "{}{} [NOT COMPUTED]", prefix, line_header);
                self.recurse_children(prefix, node, level);
            }
            _ => {
                let formula = self.format_formula(self.registry.operator_for(node), &node.children);
                let _ = writeln!(self.output, "{}{} = {}", prefix, line_header, formula);
                self.recurse_children(prefix, node, level);
            }
        }
    }

    fn recurse_children(&mut self, prefix: &str, node: &DefinitionNode, level: usize) {
        let stem = build_child_stem(prefix);
        for (i, child) in node.children.iter().enumerate() {
            let connector = if i == node.children.len() - 1 { "`--" } else { "|--" };
            self.trace_node(child, level + 1, &format!("{}{}", stem, connector));
        }
    }

    fn format_formula(&self, op: Operator, children: &[DefinitionNode]) -> String {
        let refs: Vec<String> = children
            .iter()
            .map(|c| {
                let name = format!("{}{}", c.name, self.format_value(c));
                if op.uses_weights() {
                    format!("{:.2}*{}", c.weight, name)
                } else {
                    name
                }
            })
            .collect();
        match op {
            Operator::SumSimple | Operator::SumWeighted => refs.join(" + "),
            Operator::MulSimple | Operator::MulWeighted => refs.join(" * "),
            Operator::Average => format!("avg({})", refs.join(", ")),
            Operator::GeometricMean => format!("gmean({})", refs.join(", ")),
        }
    }

    fn format_value(&self, node: &DefinitionNode) -> String {
        let Some(field) = node.value_field() else {
            return "[?]".to_string();
        };
        match self.table.get_cell(self.feature, field) {
            Ok(Cell::Number(v)) => format!("[{:.3}]", v),
            Ok(Cell::Missing) => "[NULL]".to_string(),
            Ok(Cell::Text(t)) => format!("['{}']", t),
            Err(e) => format!("[Err: {}]", e),
        }
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::MemoryTable;

    #[test]
    fn test_trace_of_computed_risk_index() {
        let mut project = DefinitionNode::project_template();
        project.add_risk_indicator("Loss", "loss").unwrap();
        project.add_risk_indicator("Exposure", "exp").unwrap();
        let mut table = MemoryTable::with_rows(1);
        table.add_numeric_column("loss", vec![Some(4.0)]).unwrap();
        table.add_numeric_column("exp", vec![None]).unwrap();
        table.add_numeric_column("RI", vec![None]).unwrap();
        let mut risk = project.risk().unwrap().clone();
        risk.field = Some("RI".into());
        risk.children[0].weight = 0.5;

        let trace = format_trace(&risk, &OperatorRegistry::default(), &table, 0);
        let expected = "\
AUDIT TRACE for feature 0 in 'RI':
--------------------------------------------------
[L1] RI[NULL] = 0.50*Loss[4.000] + 1.00*Exposure[NULL]
|--[L2] Loss[4.000] -> Var(loss)
`--[L2] Exposure[NULL] -> Var(exp)
";
        assert_eq!(trace, expected);
    }

    #[test]
    fn test_nested_stems_and_uncomputed_nodes() {
        let mut project = DefinitionNode::project_template();
        project.add_indicator_to_theme("Population", "Density", "dens").unwrap();
        project.set_operator(&[1], Operator::Average).unwrap();
        let table = MemoryTable::with_rows(1);

        let trace = format_trace(project.svi().unwrap(), &OperatorRegistry::default(), &table, 0);
        let lines: Vec<&str> = trace.lines().collect();
        assert_eq!(lines[2], "[L1] SVI[?] [NOT COMPUTED]");
        assert_eq!(lines[3], "`--[L2] Population[?] [NOT COMPUTED]");
        assert!(lines[4].starts_with("   `--[L3] Density[Err: "));
    }

    #[test]
    fn test_unknown_feature() {
        let table = MemoryTable::with_rows(1);
        let trace = format_trace(&DefinitionNode::project_template(), &OperatorRegistry::default(), &table, 7);
        assert_eq!(trace, "Error: Invalid feature ID 7\n");
    }
}
