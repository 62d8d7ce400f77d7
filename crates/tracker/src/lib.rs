//! # Lineage Tracker
//!
//! Turns a stream of file read/write observations into provenance records.
//!
//! ## Pipeline
//!
//! ```text
//! IoEvent (path, read|write, context)
//!     │
//!     ├──> Content Identity
//!     │      └─ canonical path, size, format, SHA-256
//!     │
//!     ├──> Tracking session
//!     │      ├─ identity cache: path -> dataset id
//!     │      └─ pending reads since the last write
//!     │
//!     └──> Provenance store
//!            ├─ read:  dataset (first sighting only)
//!            └─ write: dataset + operation + pending × write edges
//! ```
//!
//! The heuristic treats every read seen since the previous write as an input
//! of the next write. It suits linear read → transform → write pipelines and
//! does no data-flow analysis. Callers that know their inputs can bypass it
//! with [`Tracker::declare`].
//!
//! ## Example
//!
//! ```no_run
//! use lineage_tracker::{IoEvent, Tracker, TrackerConfig};
//! use lineage_store::RunStatus;
//!
//! fn main() -> lineage_tracker::Result<()> {
//!     let mut tracker = Tracker::open("lineage.db", TrackerConfig::default())?;
//!     tracker.start(Some("pipeline.py"))?;
//!
//!     tracker.observe(IoEvent::read("raw.csv"))?;
//!     tracker.observe(IoEvent::write("clean.csv").with_function("clean"))?;
//!
//!     tracker.stop(RunStatus::Completed)?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod event;
pub mod identity;
mod session;
mod tracker;
mod verify;

pub use config::TrackerConfig;
pub use error::{IdentityError, Result, TrackerError};
pub use event::{parse_event_log, CallContext, Direction, IoEvent};
pub use identity::{identify, FileIdentity};
pub use session::TrackingSession;
pub use tracker::{
    Declaration, DeclaredOperation, IngestStats, LineageSummary, Observation, Tracker,
};
pub use verify::{verify_dataset, verify_store, DatasetVerification, VerificationStatus};
