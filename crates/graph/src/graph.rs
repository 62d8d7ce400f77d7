use crate::error::{GraphError, Result};
use crate::types::{GraphStats, LineageGraph};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::NodeIndex;
use petgraph::visit::Bfs;
use petgraph::{Direction, Graph};

impl LineageGraph {
    /// Labels with no inbound edge (original inputs)
    pub fn sources(&self) -> Vec<String> {
        self.labels_without(Direction::Incoming)
    }

    /// Labels with no outbound edge (final outputs)
    pub fn sinks(&self) -> Vec<String> {
        self.labels_without(Direction::Outgoing)
    }

    fn labels_without(&self, dir: Direction) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.neighbors_directed(idx, dir).next().is_none())
            .filter_map(|idx| self.get_node(idx).map(|node| node.label.clone()))
            .collect()
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.node_count(),
            edges: self.edge_count(),
            is_dag: self.is_acyclic(),
            sources: self.sources(),
            sinks: self.sinks(),
        }
    }

    /// Every label `label` was derived from, nearest first
    pub fn upstream(&self, label: &str) -> Result<Vec<String>> {
        let start = self.require(label)?;
        let mut reversed = self.graph.clone();
        reversed.reverse();
        Ok(self.reachable(&reversed, start))
    }

    /// Every label derived from `label`, nearest first
    pub fn downstream(&self, label: &str) -> Result<Vec<String>> {
        let start = self.require(label)?;
        Ok(self.reachable(&self.graph, start))
    }

    fn require(&self, label: &str) -> Result<NodeIndex> {
        self.find_node(label)
            .ok_or_else(|| GraphError::NodeNotFound(label.to_string()))
    }

    fn reachable<N, E>(&self, graph: &Graph<N, E>, start: NodeIndex) -> Vec<String> {
        let mut bfs = Bfs::new(graph, start);
        let mut labels = Vec::new();
        while let Some(idx) = bfs.next(graph) {
            if idx == start {
                continue;
            }
            if let Some(node) = self.get_node(idx) {
                labels.push(node.label.clone());
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{GraphEdge, LineageGraph};
    use lineage_store::OperationKind;
    use pretty_assertions::assert_eq;

    fn chain(labels: &[&str]) -> LineageGraph {
        let mut graph = LineageGraph::new();
        for pair in labels.windows(2) {
            let from = graph.ensure_node(pair[0]);
            let to = graph.ensure_node(pair[1]);
            graph.link(
                from,
                to,
                GraphEdge {
                    operation: "step".to_string(),
                    kind: OperationKind::Write,
                },
            );
        }
        graph
    }

    #[test]
    fn traversal_in_both_directions() {
        let graph = chain(&["raw.csv", "clean.csv", "final.csv"]);
        assert_eq!(graph.upstream("final.csv").unwrap(), vec!["clean.csv", "raw.csv"]);
        assert_eq!(graph.downstream("raw.csv").unwrap(), vec!["clean.csv", "final.csv"]);
        assert!(graph.upstream("raw.csv").unwrap().is_empty());
    }

    #[test]
    fn unknown_label_is_an_error() {
        let graph = chain(&["a.csv", "b.csv"]);
        assert!(graph.downstream("zzz.csv").is_err());
    }

    #[test]
    fn cycle_is_detected() {
        let graph = chain(&["a.csv", "b.csv", "a.csv"]);
        assert!(!graph.is_acyclic());
        assert!(graph.sources().is_empty());
        assert!(graph.sinks().is_empty());
    }
}
