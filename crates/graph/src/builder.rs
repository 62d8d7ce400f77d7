use crate::types::{GraphEdge, LineageGraph};
use lineage_store::EdgeView;

/// Build lineage graph from joined store edges
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    unknown_operation: String,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            unknown_operation: "unknown".to_string(),
        }
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label used for edges whose operation has no function name
    #[must_use]
    pub fn with_unknown_operation(mut self, label: impl Into<String>) -> Self {
        self.unknown_operation = label.into();
        self
    }

    /// Build graph from edges (oldest first, as the store lists them).
    ///
    /// Files sharing a basename collapse into one node, and repeated
    /// `source -> target` pairs keep only the latest operation.
    pub fn build(&self, edges: &[EdgeView]) -> LineageGraph {
        let mut graph = LineageGraph::new();

        for edge in edges {
            let from = graph.ensure_node(edge.source_name());
            let to = graph.ensure_node(edge.target_name());

            let operation = if edge.operation.trim().is_empty() {
                self.unknown_operation.clone()
            } else {
                edge.operation.clone()
            };

            graph.link(
                from,
                to,
                GraphEdge {
                    operation,
                    kind: edge.operation_kind,
                },
            );
        }

        if graph.is_empty() {
            log::warn!("No lineage data found");
        } else {
            log::info!(
                "Graph built: {} nodes, {} edges",
                graph.node_count(),
                graph.edge_count()
            );
        }
        graph
    }
}
