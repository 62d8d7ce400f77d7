use crate::error::Result;
use crate::types::{GraphEdge, GraphNode, GraphStats, LineageGraph, NodeCategory};
use lineage_store::OperationKind;
use petgraph::dot::Dot;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNode {
    pub label: String,
    pub category: NodeCategory,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEdge {
    pub source: String,
    pub target: String,
    pub operation: String,
    pub kind: OperationKind,
}

/// Renderer-neutral snapshot of a lineage graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExport {
    pub stats: GraphStats,
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl fmt::Display for GraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.operation)
    }
}

impl LineageGraph {
    /// Nodes and edges in insertion order
    pub fn export(&self) -> GraphExport {
        let nodes = self
            .nodes()
            .map(|node| ExportNode {
                label: node.label.clone(),
                category: node.category,
                color: node.category.color().to_string(),
            })
            .collect();

        let edges = self
            .graph
            .edge_references()
            .map(|edge| ExportEdge {
                source: self.graph[edge.source()].label.clone(),
                target: self.graph[edge.target()].label.clone(),
                operation: edge.weight().operation.clone(),
                kind: edge.weight().kind,
            })
            .collect();

        GraphExport {
            stats: self.stats(),
            nodes,
            edges,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    /// Graphviz source; nodes are filled with their category colour.
    pub fn to_dot(&self) -> String {
        let dot = Dot::with_attr_getters(
            &self.graph,
            &[],
            &|_, edge| format!("tooltip=\"{}\"", edge.weight().kind),
            &|_, (_, node)| {
                format!(
                    "style=filled, fillcolor=\"{}\", shape=box",
                    node.category.color()
                )
            },
        );
        format!("{dot}")
    }

    pub fn to_text(&self) -> String {
        if self.is_empty() {
            return "Empty graph".to_string();
        }

        let rule = "-".repeat(60);
        let mut out = String::new();
        out.push_str("Data Lineage Graph\n");
        out.push_str(&"=".repeat(60));
        out.push('\n');
        out.push_str(&format!("Nodes: {}\n", self.node_count()));
        out.push_str(&format!("Edges: {}\n\n", self.edge_count()));
        out.push_str("Data Flow:\n");
        out.push_str(&rule);
        out.push('\n');

        for edge in self.export().edges {
            out.push_str(&format!("  {} → {}\n", edge.source, edge.target));
            out.push_str(&format!("    Operation: {} ({})\n\n", edge.operation, edge.kind));
        }
        out
    }
}
