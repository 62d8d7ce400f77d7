//! # Lineage Report
//!
//! Compliance documentation (EU AI Act Article 10) derived from the
//! provenance store.
//!
//! ```text
//! datasets + operations + lineage edges + timestamp
//!     │
//!     └──> derive_report (pure)
//!            ├─ ComplianceReport ──> JSON
//!            └─ render_markdown  ──> markdown document
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use lineage_report::{derive_report, render_markdown};
//! use lineage_store::ProvenanceStore;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ProvenanceStore::open("lineage.db")?;
//!     let report = derive_report(
//!         &store.all_datasets()?,
//!         &store.all_operations()?,
//!         &store.lineage_edges()?,
//!         chrono::Utc::now(),
//!     );
//!     std::fs::write("compliance_report.md", render_markdown(&report))?;
//!     Ok(())
//! }
//! ```

mod error;
mod markdown;
mod model;

pub use error::{ReportError, Result};
pub use markdown::{format_bytes, render_markdown};
pub use model::{
    derive_report, ComplianceReport, ComplianceStatement, DatasetEntry, HashEntry, LineageEntry,
    OperationEntry, ReportHeader, ReportSummary, Requirement, VerificationSection, ARTICLE,
    REGULATION, REPORT_TYPE,
};
