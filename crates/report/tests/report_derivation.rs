use chrono::{DateTime, TimeZone, Utc};
use lineage_report::{derive_report, render_markdown, ReportSummary};
use lineage_store::{Dataset, EdgeView, Operation, OperationKind};
use pretty_assertions::assert_eq;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn dataset(id: &str, path: &str, size: u64) -> Dataset {
    Dataset {
        id: id.to_string(),
        filepath: path.to_string(),
        hash: format!("hash-{id}"),
        size,
        format: Some("csv".to_string()),
        created_at: at(0),
        metadata: None,
    }
}

fn edge(source: &str, target: &str, operation: &str) -> EdgeView {
    EdgeView {
        source: source.to_string(),
        target: target.to_string(),
        operation: operation.to_string(),
        operation_kind: OperationKind::Write,
        relationship: "derived_from".to_string(),
        created_at: at(10),
    }
}

fn fixture() -> (Vec<Dataset>, Vec<Operation>, Vec<EdgeView>) {
    let datasets = vec![
        dataset("c", "/data/final.csv", 4096),
        dataset("b", "/data/clean.csv", 2048),
        dataset("a", "/data/raw.csv", 1536),
    ];
    let mut params = serde_json::Map::new();
    params.insert("threshold".to_string(), serde_json::json!(0.5));
    let operations = vec![
        Operation {
            id: "op2".to_string(),
            kind: OperationKind::Write,
            function_name: "aggregate".to_string(),
            code_snippet: None,
            parameters: None,
            executed_at: at(20),
        },
        Operation {
            id: "op1".to_string(),
            kind: OperationKind::Transform,
            function_name: "clean".to_string(),
            code_snippet: Some("df.dropna()".to_string()),
            parameters: Some(params),
            executed_at: at(10),
        },
    ];
    let edges = vec![
        edge("/data/raw.csv", "/data/clean.csv", "clean"),
        edge("/data/clean.csv", "/data/final.csv", "aggregate"),
    ];
    (datasets, operations, edges)
}

#[test]
fn summary_counts_sources_and_outputs() {
    let (datasets, operations, edges) = fixture();
    let report = derive_report(&datasets, &operations, &edges, at(100));

    assert_eq!(
        report.summary,
        ReportSummary {
            total_datasets: 3,
            total_operations: 2,
            total_lineage_edges: 2,
            source_datasets: 1,
            output_artifacts: 1,
        }
    );
    assert_eq!(report.lineage[0].narrative(), "raw.csv → [clean] → clean.csv");
    assert_eq!(report.datasets[0].filename, "final.csv");
    assert_eq!(report.verification.hashes.len(), 3);
}

#[test]
fn derivation_is_deterministic() {
    let (datasets, operations, edges) = fixture();
    let first = derive_report(&datasets, &operations, &edges, at(100));
    let second = derive_report(&datasets, &operations, &edges, at(100));
    assert_eq!(first, second);
    assert_eq!(render_markdown(&first), render_markdown(&second));
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn empty_store_still_produces_a_report() {
    let report = derive_report(&[], &[], &[], at(0));
    assert_eq!(report.summary.total_datasets, 0);
    assert_eq!(report.summary.source_datasets, 0);

    let md = render_markdown(&report);
    assert!(md.contains("*No transformations recorded.*"));
    assert!(md.contains("*No lineage relationships recorded.*"));
    assert!(md.contains("## 4. EU AI Act Compliance Statement"));
}

#[test]
fn json_uses_flat_header_fields() {
    let (datasets, operations, edges) = fixture();
    let report = derive_report(&datasets, &operations, &edges, at(100));
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["report_type"], "eu_ai_act_compliance");
    assert_eq!(json["compliance_status"], "compliant");
    assert_eq!(json["summary"]["total_lineage_edges"], 2);
    assert_eq!(json["operations"][1]["type"], "transform");
    assert_eq!(json["operations"][1]["parameters"]["threshold"], 0.5);
    assert_eq!(json["lineage"][0]["source"], "/data/raw.csv");
}

#[test]
fn markdown_has_every_section() {
    let (datasets, operations, edges) = fixture();
    let md = render_markdown(&derive_report(&datasets, &operations, &edges, at(100)));

    for heading in [
        "# ML Model Data Lineage Report",
        "## Executive Summary",
        "## 1. Data Sources",
        "## 2. Data Transformations",
        "## 3. Data Lineage Graph",
        "## 4. EU AI Act Compliance Statement",
        "## 5. Verification & Reproducibility",
    ] {
        assert!(md.contains(heading), "missing {heading}");
    }
    assert!(md.contains("**Generated:** 2023-11-14 22:15:00 UTC"));
    assert!(md.contains("- **Size:** 1.50 KB"));
    assert!(md.contains("#### Transformation 2: clean"));
    assert!(md.contains("df.dropna()"));
    assert!(md.contains("`{\"threshold\":0.5}`"));
    assert!(md.contains("clean.csv → [aggregate] → final.csv"));
}
