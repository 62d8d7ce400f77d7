use lineage_graph::GraphStats;
use lineage_report::format_bytes;
use lineage_store::{Dataset, EdgeView, Operation, StoreCounts};
use lineage_tracker::{DatasetVerification, VerificationStatus};

const PREVIEW: usize = 10;

fn banner(out: &mut String, title: &str) {
    let rule = "=".repeat(60);
    out.push_str(&format!("{rule}\n{title}\n{rule}\n"));
}

fn short_hash(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

pub fn summary(counts: &StoreCounts, datasets: &[Dataset], edges: &[EdgeView]) -> String {
    let mut out = String::new();
    banner(&mut out, "LINEAGE SUMMARY");
    out.push_str(&format!("Datasets: {}\n", counts.datasets));
    out.push_str(&format!("Operations: {}\n", counts.operations));
    out.push_str(&format!("Lineage edges: {}\n", counts.edges));
    out.push_str(&format!("Runs: {}\n", counts.runs));

    if !datasets.is_empty() {
        out.push('\n');
        banner(&mut out, "DATASETS");
        for ds in datasets.iter().take(PREVIEW) {
            out.push_str(&format!("• {}\n", ds.file_name()));
            out.push_str(&format!("  Hash: {}...\n", short_hash(&ds.hash)));
            out.push_str(&format!("  Size: {} bytes\n", ds.size));
            out.push_str(&format!(
                "  Format: {}\n",
                ds.format.as_deref().unwrap_or("unknown")
            ));
        }
        if datasets.len() > PREVIEW {
            out.push_str(&format!("... and {} more\n", datasets.len() - PREVIEW));
        }
    }

    if !edges.is_empty() {
        out.push('\n');
        banner(&mut out, "DATA FLOW");
        for edge in edges.iter().take(PREVIEW) {
            out.push_str(&format!(
                "  {} → {} ({})\n",
                edge.source_name(),
                edge.target_name(),
                edge.operation
            ));
        }
        if edges.len() > PREVIEW {
            out.push_str(&format!("... and {} more edges\n", edges.len() - PREVIEW));
        }
    }
    out
}

pub fn datasets(datasets: &[Dataset]) -> String {
    if datasets.is_empty() {
        return "No datasets recorded\n".to_string();
    }
    let mut out = String::new();
    for ds in datasets {
        out.push_str(&format!(
            "{}  {}  {:>12}  {}  {}\n",
            ds.id,
            short_hash(&ds.hash),
            format_bytes(ds.size),
            ds.created_at.format("%Y-%m-%d %H:%M:%S"),
            ds.filepath
        ));
    }
    out
}

pub fn operations(operations: &[Operation]) -> String {
    if operations.is_empty() {
        return "No operations recorded\n".to_string();
    }
    let mut out = String::new();
    for op in operations {
        out.push_str(&format!(
            "{}  {:<9}  {}  {}\n",
            op.id,
            op.kind,
            op.executed_at.format("%Y-%m-%d %H:%M:%S"),
            op.function_name
        ));
        if let Some(code) = &op.code_snippet {
            out.push_str(&format!("    {code}\n"));
        }
    }
    out
}

pub fn stats(stats: &GraphStats) -> String {
    let mut out = String::new();
    out.push_str("Graph Statistics:\n");
    out.push_str(&format!("  Nodes: {}\n", stats.nodes));
    out.push_str(&format!("  Edges: {}\n", stats.edges));
    out.push_str(&format!("  Acyclic: {}\n", if stats.is_dag { "yes" } else { "no" }));
    out.push_str(&format!(
        "  Sources ({}): {}\n",
        stats.sources.len(),
        stats.sources.join(", ")
    ));
    out.push_str(&format!(
        "  Sinks ({}): {}\n",
        stats.sinks.len(),
        stats.sinks.join(", ")
    ));
    out
}

pub fn lineage_list(title: &str, label: &str, labels: &[String]) -> String {
    let mut out = format!("{title} {label}:\n");
    if labels.is_empty() {
        out.push_str("  (none)\n");
    }
    for name in labels {
        out.push_str(&format!("  {name}\n"));
    }
    out
}

pub fn verification(results: &[DatasetVerification]) -> String {
    if results.is_empty() {
        return "No datasets recorded\n".to_string();
    }
    let mut out = String::new();
    for r in results {
        let status = match &r.status {
            VerificationStatus::Verified => "verified".to_string(),
            VerificationStatus::Modified { current_hash } => {
                format!("MODIFIED (now {}...)", short_hash(current_hash))
            }
            VerificationStatus::Missing => "MISSING".to_string(),
            VerificationStatus::Unreadable { error } => format!("UNREADABLE ({error})"),
        };
        out.push_str(&format!("{status:<10}  {}\n", r.filepath));
    }
    let ok = results.iter().filter(|r| r.status.is_verified()).count();
    out.push_str(&format!("\n{ok}/{} verified\n", results.len()));
    out
}
