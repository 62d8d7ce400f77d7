use crate::model::ComplianceReport;

const RULE: &str = "---\n\n";

/// Render the report as a markdown document.
pub fn render_markdown(report: &ComplianceReport) -> String {
    let mut md = String::new();
    render_header(&mut md, report);
    render_summary(&mut md, report);
    render_datasets(&mut md, report);
    render_operations(&mut md, report);
    render_lineage(&mut md, report);
    render_statement(&mut md, report);
    render_verification(&mut md, report);
    md
}

fn render_header(md: &mut String, report: &ComplianceReport) {
    let header = &report.header;
    md.push_str("# ML Model Data Lineage Report\n\n");
    md.push_str("**Report Type:** EU AI Act Article 10 Compliance  \n");
    md.push_str(&format!(
        "**Generated:** {}  \n",
        header.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!("**Standard:** {}  \n", header.regulation));
    md.push_str(&format!("**Article:** {}\n\n", header.article));
    md.push_str(RULE);
}

fn render_summary(md: &mut String, report: &ComplianceReport) {
    let s = &report.summary;
    md.push_str("## Executive Summary\n\n");
    md.push_str(
        "This report documents the data lineage recorded for model development, \
         as required by EU AI Act Article 10 for training data quality and data \
         governance.\n\n",
    );
    md.push_str("**Key Metrics:**\n");
    md.push_str(&format!("- **Total Datasets Tracked:** {}\n", s.total_datasets));
    md.push_str(&format!("- **Data Transformations:** {}\n", s.total_operations));
    md.push_str(&format!("- **Lineage Relationships:** {}\n", s.total_lineage_edges));
    md.push_str(&format!("- **Source Datasets:** {}\n", s.source_datasets));
    md.push_str(&format!("- **Output Artifacts:** {}\n\n", s.output_artifacts));
    md.push_str(&format!(
        "**Compliance Status:** **{}**\n\n",
        report.compliance_status.to_uppercase()
    ));
    md.push_str(RULE);
}

fn render_datasets(md: &mut String, report: &ComplianceReport) {
    md.push_str("## 1. Data Sources\n\n");
    md.push_str("### 1.1 Training Data Inventory\n\n");
    md.push_str(
        "All datasets used in model development are listed with their SHA-256 \
         hash for integrity verification.\n\n",
    );

    if report.datasets.is_empty() {
        md.push_str("*No datasets recorded.*\n\n");
    }

    for (i, ds) in report.datasets.iter().enumerate() {
        md.push_str(&format!("#### Dataset {}: {}\n\n", i + 1, ds.filename));
        md.push_str(&format!("- **File Path:** `{}`\n", ds.filepath));
        md.push_str(&format!(
            "- **Format:** {}\n",
            ds.format.as_deref().unwrap_or("unknown").to_uppercase()
        ));
        md.push_str(&format!("- **Size:** {}\n", format_bytes(ds.size)));
        md.push_str(&format!("- **SHA-256 Hash:** `{}`\n", ds.hash));
        md.push_str(&format!("- **Created:** {}\n\n", ds.created_at.to_rfc3339()));
    }
    md.push_str(RULE);
}

fn render_operations(md: &mut String, report: &ComplianceReport) {
    md.push_str("## 2. Data Transformations\n\n");
    md.push_str("### 2.1 Processing Pipeline\n\n");

    if report.operations.is_empty() {
        md.push_str("*No transformations recorded.*\n\n");
        md.push_str(RULE);
        return;
    }

    for (i, op) in report.operations.iter().enumerate() {
        md.push_str(&format!("#### Transformation {}: {}\n\n", i + 1, op.function));
        md.push_str(&format!("- **Type:** {}\n", op.kind));
        md.push_str(&format!("- **Executed:** {}\n", op.executed_at.to_rfc3339()));
        md.push_str("- **Code Reference:**\n\n```\n");
        md.push_str(op.code.as_deref().unwrap_or("N/A"));
        md.push_str("\n```\n");
        if let Some(params) = &op.parameters {
            let rendered = serde_json::Value::Object(params.clone());
            md.push_str(&format!("- **Parameters:** `{rendered}`\n"));
        }
        md.push('\n');
    }
    md.push_str(RULE);
}

fn render_lineage(md: &mut String, report: &ComplianceReport) {
    md.push_str("## 3. Data Lineage Graph\n\n");
    md.push_str("### 3.1 Provenance Chain\n\n");

    if report.lineage.is_empty() {
        md.push_str("*No lineage relationships recorded.*\n\n");
        md.push_str(RULE);
        return;
    }

    md.push_str("```\nData Flow:\n");
    for entry in &report.lineage {
        md.push_str(&format!("  {}\n", entry.narrative()));
    }
    md.push_str("```\n\n");
    md.push_str(RULE);
}

fn render_statement(md: &mut String, report: &ComplianceReport) {
    let statement = &report.compliance_statement;
    md.push_str("## 4. EU AI Act Compliance Statement\n\n");
    md.push_str("### 4.1 Article 10 Requirements\n\n");
    for req in &statement.requirements {
        md.push_str(&format!("**{} ({})**\n", req.title, req.clause));
        for line in &req.evidence {
            md.push_str(&format!("- {line}\n"));
        }
        md.push('\n');
    }

    md.push_str("### 4.2 Regulatory Compliance\n\n");
    md.push_str(&format!("**Regulation:** {}  \n", report.header.regulation));
    md.push_str(&format!("**Applicable Articles:** {}  \n", report.header.article));
    md.push_str(&format!(
        "**Compliance Date:** {}  \n",
        report.header.generated_at.format("%Y-%m-%d")
    ));
    md.push_str(&format!(
        "**Verification Method:** {}\n\n",
        statement.verification_method
    ));
    md.push_str("**Declaration:** lineage tracking enables\n\n");
    for (i, line) in statement.declaration.iter().enumerate() {
        md.push_str(&format!("{}. {line}\n", i + 1));
    }
    md.push('\n');
    md.push_str(RULE);
}

fn render_verification(md: &mut String, report: &ComplianceReport) {
    md.push_str("## 5. Verification & Reproducibility\n\n");
    md.push_str("### 5.1 Hash Verification\n\n");
    if !report.verification.hashes.is_empty() {
        md.push_str("| file | sha256 |\n");
        md.push_str("|---|---|\n");
        for entry in &report.verification.hashes {
            md.push_str(&format!("| `{}` | `{}` |\n", entry.filename, entry.hash));
        }
        md.push('\n');
    }
    md.push_str("```bash\n");
    md.push_str("# Linux / macOS\nsha256sum <filename>\n\n");
    md.push_str("# Windows\ncertutil -hashfile <filename> SHA256\n");
    md.push_str("```\n\n");

    md.push_str("### 5.2 Reproducibility Instructions\n\n");
    for (i, step) in report.verification.reproduction_steps.iter().enumerate() {
        md.push_str(&format!("{}. {step}\n", i + 1));
    }
    md.push('\n');

    md.push_str("### 5.3 Audit Trail\n\n");
    md.push_str("```bash\n");
    md.push_str("lineage summary\n");
    md.push_str("lineage verify\n");
    md.push_str("lineage show --format dot --output lineage.dot\n");
    md.push_str("```\n");
}

/// Human-readable size: `1.50 KB`, `0.00 B`, ...
pub fn format_bytes(size: u64) -> String {
    let mut value = size as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} TB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_scale_through_units() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_bytes(2 * 1024u64.pow(4)), "2.00 TB");
    }
}
