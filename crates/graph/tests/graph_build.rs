use chrono::Utc;
use lineage_graph::{GraphBuilder, GraphStats, NodeCategory};
use lineage_store::{EdgeView, OperationKind};
use pretty_assertions::assert_eq;

fn edge(source: &str, target: &str, operation: &str) -> EdgeView {
    EdgeView {
        source: source.to_string(),
        target: target.to_string(),
        operation: operation.to_string(),
        operation_kind: OperationKind::Write,
        relationship: "derived_from".to_string(),
        created_at: Utc::now(),
    }
}

fn pipeline() -> Vec<EdgeView> {
    vec![
        edge("/data/raw.csv", "/data/clean.csv", "clean"),
        edge("/data/clean.csv", "/data/final.parquet", "aggregate"),
    ]
}

#[test]
fn straight_pipeline_stats() {
    let graph = GraphBuilder::new().build(&pipeline());
    assert_eq!(
        graph.stats(),
        GraphStats {
            nodes: 3,
            edges: 2,
            is_dag: true,
            sources: vec!["raw.csv".to_string()],
            sinks: vec!["final.parquet".to_string()],
        }
    );
}

#[test]
fn empty_input_gives_empty_graph() {
    let graph = GraphBuilder::new().build(&[]);
    let stats = graph.stats();
    assert_eq!(stats.nodes, 0);
    assert_eq!(stats.edges, 0);
    assert!(stats.is_dag);
    assert!(stats.sources.is_empty());
    assert_eq!(graph.to_text(), "Empty graph");
}

#[test]
fn rebuilding_gives_the_same_graph() {
    let builder = GraphBuilder::new();
    let first = builder.build(&pipeline()).export();
    let second = builder.build(&pipeline()).export();
    assert_eq!(first, second);
}

#[test]
fn same_basename_collapses_into_one_node() {
    let edges = vec![
        edge("/a/data.csv", "/out/x.csv", "f"),
        edge("/b/data.csv", "/out/y.csv", "g"),
    ];
    let graph = GraphBuilder::new().build(&edges);
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.downstream("data.csv").unwrap().len(), 2);
}

#[test]
fn blank_operation_uses_the_configured_label() {
    let edges = vec![edge("/d/a.csv", "/d/b.csv", "  ")];
    let labelled = GraphBuilder::new()
        .with_unknown_operation("transformation")
        .build(&edges)
        .export();
    assert_eq!(labelled.edges[0].operation, "transformation");
}

#[test]
fn repeated_pair_keeps_latest_operation() {
    let edges = vec![
        edge("/d/a.csv", "/d/b.csv", "first"),
        edge("/d/a.csv", "/d/b.csv", "second"),
    ];
    let export = GraphBuilder::new().build(&edges).export();
    assert_eq!(export.edges.len(), 1);
    assert_eq!(export.edges[0].operation, "second");
}

#[test]
fn blank_operation_is_labelled_unknown() {
    let export = GraphBuilder::new()
        .build(&[edge("/d/a.csv", "/d/b.csv", "")])
        .export();
    assert_eq!(export.edges[0].operation, "unknown");
}

#[test]
fn exports_carry_categories_and_colours() {
    let graph = GraphBuilder::new().build(&pipeline());
    let export = graph.export();
    let labels: Vec<_> = export.nodes.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["raw.csv", "clean.csv", "final.parquet"]);
    assert_eq!(export.nodes[2].category, NodeCategory::Parquet);
    assert_eq!(export.nodes[2].color, "#2196F3");

    let json: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
    assert_eq!(json["stats"]["nodes"], 3);
    assert_eq!(json["edges"][0]["kind"], "write");

    let dot = graph.to_dot();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("#4CAF50"));

    let text = graph.to_text();
    assert!(text.contains("raw.csv → clean.csv"));
    assert!(text.contains("Operation: aggregate"));
}
