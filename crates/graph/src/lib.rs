//! # Lineage Graph
//!
//! Derives a display graph from stored lineage edges.
//!
//! ## Architecture
//!
//! ```text
//! EdgeView[] (store, oldest first)
//!     │
//!     ├──> Graph Builder
//!     │      ├─ node per file name (basename)
//!     │      └─ edge per source/target pair, latest operation wins
//!     │
//!     ├──> Lineage Graph (petgraph)
//!     │      ├─ sources / sinks / acyclicity
//!     │      └─ upstream / downstream traversal
//!     │
//!     └──> Export
//!            └─ JSON, Graphviz DOT, plain text
//! ```
//!
//! Nodes are keyed by file name only, so two files with the same name in
//! different directories share a node. The store itself keeps full paths.

mod builder;
mod error;
mod export;
mod graph;
mod types;

pub use builder::GraphBuilder;
pub use error::{GraphError, Result};
pub use export::{ExportEdge, ExportNode, GraphExport};
pub use types::{GraphEdge, GraphNode, GraphStats, LineageGraph, NodeCategory};
