use lineage_store::OperationKind;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// File family of a node, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Csv,
    Parquet,
    Json,
    Pickle,
    Numpy,
    Text,
    Excel,
    Other,
}

impl NodeCategory {
    pub fn from_label(label: &str) -> Self {
        let ext = Path::new(label)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());

        match ext.as_deref() {
            Some("csv") => Self::Csv,
            Some("parquet") => Self::Parquet,
            Some("json") => Self::Json,
            Some("pkl" | "pickle") => Self::Pickle,
            Some("npy") => Self::Numpy,
            Some("txt") => Self::Text,
            Some("xlsx" | "xls") => Self::Excel,
            _ => Self::Other,
        }
    }

    /// Fill colour used by renderers
    pub const fn color(self) -> &'static str {
        match self {
            Self::Csv => "#4CAF50",
            Self::Parquet => "#2196F3",
            Self::Json => "#FF9800",
            Self::Pickle => "#9C27B0",
            Self::Numpy => "#F44336",
            Self::Text => "#795548",
            Self::Excel => "#00BCD4",
            Self::Other => "#9E9E9E",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Json => "json",
            Self::Pickle => "pickle",
            Self::Numpy => "numpy",
            Self::Text => "text",
            Self::Excel => "excel",
            Self::Other => "other",
        }
    }
}

/// Node in lineage graph: one display label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// File name of the dataset (not the full path)
    pub label: String,

    pub category: NodeCategory,
}

impl GraphNode {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let category = NodeCategory::from_label(&label);
        Self { label, category }
    }
}

/// Edge in lineage graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Function the producing operation is attributed to
    pub operation: String,

    pub kind: OperationKind,
}

/// Lineage graph keyed by display label
#[derive(Debug, Clone, Default)]
pub struct LineageGraph {
    /// Directed graph (input file -> derived file)
    pub graph: DiGraph<GraphNode, GraphEdge>,

    /// Label -> NodeIndex mapping for fast lookup
    pub label_index: HashMap<String, NodeIndex>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the node for `label`, inserting it on first sight.
    pub fn ensure_node(&mut self, label: &str) -> NodeIndex {
        if let Some(&idx) = self.label_index.get(label) {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode::new(label));
        self.label_index.insert(label.to_string(), idx);
        idx
    }

    /// Add or replace the edge `from -> to`; the latest operation wins.
    pub fn link(&mut self, from: NodeIndex, to: NodeIndex, edge: GraphEdge) {
        self.graph.update_edge(from, to, edge);
    }

    pub fn find_node(&self, label: &str) -> Option<NodeIndex> {
        self.label_index.get(label).copied()
    }

    pub fn get_node(&self, idx: NodeIndex) -> Option<&GraphNode> {
        self.graph.node_weight(idx)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

/// Summary metrics of a lineage graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub is_dag: bool,

    /// Labels with no inbound edge
    pub sources: Vec<String>,

    /// Labels with no outbound edge
    pub sinks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_extension() {
        assert_eq!(NodeCategory::from_label("raw.CSV"), NodeCategory::Csv);
        assert_eq!(NodeCategory::from_label("model.pkl"), NodeCategory::Pickle);
        assert_eq!(NodeCategory::from_label("model.pickle"), NodeCategory::Pickle);
        assert_eq!(NodeCategory::from_label("book.xls"), NodeCategory::Excel);
        assert_eq!(NodeCategory::from_label("Makefile"), NodeCategory::Other);
        assert_eq!(NodeCategory::Other.color(), "#9E9E9E");
    }

    #[test]
    fn ensure_node_is_idempotent() {
        let mut graph = LineageGraph::new();
        let a = graph.ensure_node("a.csv");
        let b = graph.ensure_node("a.csv");
        assert_eq!(a, b);
        assert_eq!(graph.node_count(), 1);
    }
}
