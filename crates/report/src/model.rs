use crate::error::Result;
use chrono::{DateTime, Utc};
use lineage_store::{Dataset, EdgeView, Metadata, Operation, OperationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const REPORT_TYPE: &str = "eu_ai_act_compliance";
pub const REGULATION: &str = "EU AI Act (Regulation 2024/1689)";
pub const ARTICLE: &str = "Article 10 - Data and Data Governance";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportHeader {
    pub report_type: String,
    pub regulation: String,
    pub article: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_datasets: usize,
    pub total_operations: usize,
    pub total_lineage_edges: usize,

    /// Paths that feed an edge but are never produced by one
    pub source_datasets: usize,

    /// Paths that are produced but never consumed
    pub output_artifacts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub filepath: String,
    pub filename: String,
    pub format: Option<String>,
    pub size: u64,
    pub hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEntry {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub function: String,
    pub code: Option<String>,
    pub parameters: Option<Metadata>,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEntry {
    pub source: String,
    pub target: String,
    pub operation: String,
}

impl LineageEntry {
    /// `raw.csv → [clean] → clean.csv`
    pub fn narrative(&self) -> String {
        format!(
            "{} → [{}] → {}",
            file_name(&self.source),
            self.operation,
            file_name(&self.target)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub clause: String,
    pub title: String,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceStatement {
    pub requirements: Vec<Requirement>,
    pub verification_method: String,
    pub declaration: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashEntry {
    pub filename: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSection {
    pub hashes: Vec<HashEntry>,
    pub reproduction_steps: Vec<String>,
}

/// Compliance report document.
///
/// Field names are the JSON contract; the markdown rendition is produced from
/// the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    #[serde(flatten)]
    pub header: ReportHeader,
    pub compliance_status: String,
    pub summary: ReportSummary,
    pub datasets: Vec<DatasetEntry>,
    pub operations: Vec<OperationEntry>,
    pub lineage: Vec<LineageEntry>,
    pub compliance_statement: ComplianceStatement,
    pub verification: VerificationSection,
}

impl ComplianceReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Derive the report from store listings.
///
/// Pure: identical inputs and `generated_at` give an identical report.
/// Listings keep the order they are passed in (the store lists datasets and
/// operations newest first, edges oldest first).
pub fn derive_report(
    datasets: &[Dataset],
    operations: &[Operation],
    edges: &[EdgeView],
    generated_at: DateTime<Utc>,
) -> ComplianceReport {
    let sources: BTreeSet<&str> = edges.iter().map(|e| e.source.as_str()).collect();
    let targets: BTreeSet<&str> = edges.iter().map(|e| e.target.as_str()).collect();

    let summary = ReportSummary {
        total_datasets: datasets.len(),
        total_operations: operations.len(),
        total_lineage_edges: edges.len(),
        source_datasets: sources.difference(&targets).count(),
        output_artifacts: targets.difference(&sources).count(),
    };

    let dataset_entries = datasets
        .iter()
        .map(|ds| DatasetEntry {
            filepath: ds.filepath.clone(),
            filename: ds.file_name().to_string(),
            format: ds.format.clone(),
            size: ds.size,
            hash: ds.hash.clone(),
            created_at: ds.created_at,
        })
        .collect();

    let operation_entries = operations
        .iter()
        .map(|op| OperationEntry {
            kind: op.kind,
            function: op.function_name.clone(),
            code: op.code_snippet.clone(),
            parameters: op.parameters.clone(),
            executed_at: op.executed_at,
        })
        .collect();

    let lineage = edges
        .iter()
        .map(|edge| LineageEntry {
            source: edge.source.clone(),
            target: edge.target.clone(),
            operation: if edge.operation.trim().is_empty() {
                "transformation".to_string()
            } else {
                edge.operation.clone()
            },
        })
        .collect();

    let hashes = datasets
        .iter()
        .map(|ds| HashEntry {
            filename: ds.file_name().to_string(),
            hash: ds.hash.clone(),
        })
        .collect();

    ComplianceReport {
        header: ReportHeader {
            report_type: REPORT_TYPE.to_string(),
            regulation: REGULATION.to_string(),
            article: ARTICLE.to_string(),
            generated_at,
        },
        compliance_status: "compliant".to_string(),
        summary,
        datasets: dataset_entries,
        operations: operation_entries,
        lineage,
        compliance_statement: compliance_statement(),
        verification: VerificationSection {
            hashes,
            reproduction_steps: strings(&[
                "Verify all source datasets using the hashes above",
                "Execute transformations in documented order",
                "Compare output hashes with documented values",
                "Validate lineage graph matches documented flow",
            ]),
        },
    }
}

fn compliance_statement() -> ComplianceStatement {
    let requirement = |clause: &str, title: &str, evidence: &[&str]| Requirement {
        clause: clause.to_string(),
        title: title.to_string(),
        evidence: strings(evidence),
    };

    ComplianceStatement {
        requirements: vec![
            requirement(
                "Article 10.2",
                "Training Data Quality",
                &[
                    "All datasets documented with cryptographic verification",
                    "Data sources clearly identified and traceable",
                    "Quality metrics maintained through hash verification",
                ],
            ),
            requirement(
                "Article 10.3",
                "Data Governance",
                &[
                    "Complete data management procedures documented",
                    "Bias detection capabilities through lineage tracking",
                    "Data gaps identified via provenance chain analysis",
                ],
            ),
            requirement(
                "Article 10.4",
                "Examination of Suitability",
                &[
                    "Data collection processes documented",
                    "Relevant, representative datasets verified",
                    "Complete audit trail maintained",
                ],
            ),
            requirement(
                "Article 10.5",
                "Processing Operations",
                &[
                    "All data processing operations logged",
                    "Transformation logic documented",
                    "Reproducibility ensured via version control",
                ],
            ),
        ],
        verification_method: "Automated lineage tracking with cryptographic proof".to_string(),
        declaration: strings(&[
            "Full traceability from raw data to model outputs",
            "Reproducibility of all training procedures",
            "Verification of data quality and representativeness",
            "Audit capability for regulatory review",
        ]),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn file_name(path: &str) -> &str {
    std::path::Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}
