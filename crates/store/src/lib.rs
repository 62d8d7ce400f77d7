//! # Lineage Store
//!
//! Durable provenance store for observed datasets and the operations that
//! connect them.
//!
//! ## Schema
//!
//! ```text
//! datasets   (id, filepath, hash, size, format, created_at, metadata)
//!     ▲  ▲
//!     │  └──────────────┐
//! lineage    (id, source_id, target_id, operation_id, relationship_type, created_at)
//!                                         │
//!                                         ▼
//! operations (id, operation_type, function_name, code_snippet, parameters, executed_at)
//!
//! runs       (id, script_path, start_time, end_time, status, metadata)
//! ```
//!
//! Every insert gets a fresh UUID v4 and is committed before the call returns.
//! Multi-record writes go through [`ProvenanceStore::transaction`], which
//! commits everything or nothing.
//!
//! ## Example
//!
//! ```no_run
//! use lineage_store::{NewDataset, NewOperation, OperationKind, ProvenanceStore};
//!
//! fn main() -> lineage_store::Result<()> {
//!     let store = ProvenanceStore::open("lineage.db")?;
//!     let raw = store.add_dataset(NewDataset::new("/data/raw.csv", "ab12", 10))?;
//!     let clean = store.add_dataset(NewDataset::new("/data/clean.csv", "cd34", 8))?;
//!     let op = store.add_operation(NewOperation::new(OperationKind::Transform, "clean"))?;
//!     store.add_edge(&raw.id, &clean.id, &op.id, None)?;
//!
//!     for edge in store.lineage_edges()? {
//!         println!("{} -> {} ({})", edge.source, edge.target, edge.operation);
//!     }
//!     Ok(())
//! }
//! ```

mod codec;
mod error;
mod schema;
mod store;
mod types;

pub use error::{Result, StoreError};
pub use schema::STORE_SCHEMA_VERSION;
pub use store::{ProvenanceStore, StoreTx};
pub use types::{
    Dataset, EdgeView, LineageEdge, Metadata, NewDataset, NewOperation, Operation,
    OperationKind, Run, RunStatus, StoreCounts, DEFAULT_RELATIONSHIP,
};
