use crate::config::TrackerConfig;
use crate::error::{IdentityError, Result, TrackerError};
use crate::event::{CallContext, Direction, IoEvent};
use crate::identity::{self, FileIdentity};
use crate::session::TrackingSession;
use lineage_store::{
    Dataset, EdgeView, LineageEdge, Metadata, NewOperation, Operation, OperationKind,
    ProvenanceStore, Run, RunStatus, StoreCounts,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of one observed event
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Path was added to (or already in) the pending-read window
    Read {
        dataset_id: String,
        newly_pending: bool,
        pending: usize,
    },

    /// Write linked every pending read to the written dataset
    Write {
        dataset_id: String,
        operation: Operation,
        edges: Vec<LineageEdge>,
    },

    /// Path vanished before it could be fingerprinted
    Dropped { path: PathBuf },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub reads: usize,
    pub writes: usize,
    pub edges: usize,
    pub dropped: usize,
}

/// Explicit transformation: every input feeds every output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declaration {
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub function_name: String,
    pub code_snippet: Option<String>,
    pub parameters: Option<Metadata>,
}

impl Declaration {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    #[must_use]
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(path.into());
        self
    }

    #[must_use]
    pub fn with_code(mut self, code_snippet: impl Into<String>) -> Self {
        self.code_snippet = Some(code_snippet.into());
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Metadata) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredOperation {
    pub operation: Operation,
    pub input_ids: Vec<String>,
    pub output_ids: Vec<String>,
    pub edges: Vec<LineageEdge>,

    /// Declared paths that did not exist
    pub skipped: Vec<PathBuf>,
}

/// Store-wide lineage snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineageSummary {
    pub counts: StoreCounts,
    pub datasets: Vec<Dataset>,
    pub operations: Vec<Operation>,
    pub edges: Vec<EdgeView>,
}

enum Resolved {
    Cached(String),
    Fresh(FileIdentity),
}

/// Lineage inference engine.
///
/// Holds one optional tracking session on top of a shared store. Sessions are
/// isolated: each tracker has its own identity cache and pending-read window.
pub struct Tracker {
    store: Arc<ProvenanceStore>,
    config: TrackerConfig,
    session: Option<TrackingSession>,
}

impl Tracker {
    pub fn new(store: Arc<ProvenanceStore>, config: TrackerConfig) -> Self {
        Self {
            store,
            config,
            session: None,
        }
    }

    /// Open the store at `db_path`. Failure here aborts the session.
    pub fn open(db_path: impl AsRef<Path>, config: TrackerConfig) -> Result<Self> {
        let store = ProvenanceStore::open(db_path)?;
        Ok(Self::new(Arc::new(store), config))
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ProvenanceStore> {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[must_use]
    pub const fn session(&self) -> Option<&TrackingSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    /// Begin a run. A second start while tracking is a no-op.
    pub fn start(&mut self, script_path: Option<&str>) -> Result<Run> {
        if let Some(session) = &self.session {
            log::warn!("Tracking already started (run {})", session.run_id());
            return Err(TrackerError::AlreadyTracking {
                run_id: session.run_id().to_string(),
            });
        }

        let run = self.store.start_run(script_path, None)?;
        log::info!("Started tracking run {}", run.id);
        self.session = Some(TrackingSession::new(run.clone()));
        Ok(run)
    }

    /// Close the run and discard the session, pending reads included.
    ///
    /// The session is discarded even when closing the run fails.
    pub fn stop(&mut self, status: RunStatus) -> Result<Run> {
        let Some(session) = self.session.take() else {
            log::warn!("No active tracking to stop");
            return Err(TrackerError::NotTracking);
        };

        if session.pending_len() > 0 {
            log::debug!(
                "Discarding {} pending read(s) without a following write",
                session.pending_len()
            );
        }

        let run = self.store.end_run(session.run_id(), status)?;
        log::info!("Ended tracking run {} ({})", run.id, run.status);
        Ok(run)
    }

    fn active_session(&mut self) -> Result<&mut TrackingSession> {
        match self.session.as_mut() {
            Some(session) => Ok(session),
            None => {
                log::warn!("No active tracking session");
                Err(TrackerError::NotTracking)
            }
        }
    }

    /// Feed one read/write observation through the pending-read heuristic.
    ///
    /// A path that no longer exists is dropped with a warning; any other
    /// failure is returned and leaves both the store and the session as they
    /// were.
    pub fn observe(&mut self, event: IoEvent) -> Result<Observation> {
        let chunk_size = self.config.hash_chunk_size;
        let session = self.active_session()?;

        let (canonical, resolved) = match resolve(session, &event.path, chunk_size) {
            Ok(found) => found,
            Err(IdentityError::NotFound(path)) => {
                log::warn!("Could not track {} (not found)", path.display());
                return Ok(Observation::Dropped { path: event.path });
            }
            Err(err) => return Err(err.into()),
        };

        match event.direction {
            Direction::Read => self.record_read(canonical, resolved),
            Direction::Write => self.record_write(canonical, resolved, &event),
        }
    }

    fn record_read(&mut self, canonical: PathBuf, resolved: Resolved) -> Result<Observation> {
        let dataset_id = match resolved {
            Resolved::Cached(id) => id,
            Resolved::Fresh(identity) => self.store.add_dataset(identity.into_new_dataset(None))?.id,
        };

        let session = self.active_session()?;
        session.remember(canonical.clone(), dataset_id.clone());
        let newly_pending = session.push_read(canonical.clone());
        log::debug!(
            "Tracked read: {} ({} pending)",
            canonical.display(),
            session.pending_len()
        );

        Ok(Observation::Read {
            dataset_id,
            newly_pending,
            pending: session.pending_len(),
        })
    }

    fn record_write(
        &mut self,
        canonical: PathBuf,
        resolved: Resolved,
        event: &IoEvent,
    ) -> Result<Observation> {
        let context = attribution(event.context.as_ref(), &self.config.unknown_function);
        let relationship = self.config.relationship.clone();
        let sources = self.active_session()?.pending_sources();

        let (dataset_id, operation, edges) = self.store.transaction(|tx| -> Result<_> {
            let dataset_id = match resolved {
                Resolved::Cached(id) => id,
                Resolved::Fresh(identity) => tx.add_dataset(identity.into_new_dataset(None))?.id,
            };

            let operation = tx.add_operation(
                NewOperation::new(OperationKind::Write, context.function_name)
                    .with_code(context.code_snippet)
                    .executed_at(event.timestamp),
            )?;

            let edges = sources
                .iter()
                .map(|source| tx.add_edge(source, &dataset_id, &operation.id, Some(&relationship)))
                .collect::<lineage_store::Result<Vec<_>>>()?;

            Ok((dataset_id, operation, edges))
        })?;

        let session = self.active_session()?;
        session.remember(canonical.clone(), dataset_id.clone());
        session.clear_pending();
        log::debug!(
            "Tracked write: {} <- {} input(s) via {}",
            canonical.display(),
            edges.len(),
            operation.function_name
        );

        Ok(Observation::Write {
            dataset_id,
            operation,
            edges,
        })
    }

    /// Consume a finite event stream: a `Vec`, a decoded log, or an
    /// `mpsc::Receiver` drained until its senders hang up.
    ///
    /// Events whose file cannot be fingerprinted are dropped with a warning;
    /// store and lifecycle errors stop ingestion.
    pub fn ingest<I>(&mut self, events: I) -> Result<IngestStats>
    where
        I: IntoIterator<Item = IoEvent>,
    {
        let mut stats = IngestStats::default();
        for event in events {
            let path = event.path.clone();
            match self.observe(event) {
                Ok(Observation::Read { .. }) => stats.reads += 1,
                Ok(Observation::Write { edges, .. }) => {
                    stats.writes += 1;
                    stats.edges += edges.len();
                }
                Ok(Observation::Dropped { .. }) => stats.dropped += 1,
                Err(TrackerError::Identity(err)) => {
                    log::warn!("Dropping event for {}: {err}", path.display());
                    stats.dropped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        log::info!(
            "Ingested {} read(s), {} write(s), {} edge(s), {} dropped",
            stats.reads,
            stats.writes,
            stats.edges,
            stats.dropped
        );
        Ok(stats)
    }

    /// Record an explicit transformation, bypassing the heuristic.
    ///
    /// Every path is fingerprinted before anything is written; datasets, the
    /// operation and all `inputs × outputs` edges are then committed in one
    /// transaction. Missing paths are skipped with a warning. The pending-read
    /// window is left untouched.
    pub fn declare(&mut self, declaration: Declaration) -> Result<DeclaredOperation> {
        let chunk_size = self.config.hash_chunk_size;
        let relationship = self.config.relationship.clone();
        let session = self.active_session()?;

        let mut skipped = Vec::new();
        let inputs = resolve_all(session, &declaration.inputs, chunk_size, &mut skipped)?;
        let outputs = resolve_all(session, &declaration.outputs, chunk_size, &mut skipped)?;

        let function_name = if declaration.function_name.trim().is_empty() {
            self.config.unknown_function.clone()
        } else {
            declaration.function_name
        };

        let (created, input_ids, output_ids, operation, edges) =
            self.store.transaction(|tx| -> Result<_> {
                let mut created: HashMap<PathBuf, String> = HashMap::new();
                let mut materialize = |entries: Vec<(PathBuf, Resolved)>| -> Result<Vec<String>> {
                    let mut ids = Vec::with_capacity(entries.len());
                    for (path, resolved) in entries {
                        let id = match resolved {
                            Resolved::Cached(id) => id,
                            Resolved::Fresh(identity) => match created.get(&path) {
                                Some(id) => id.clone(),
                                None => {
                                    let id = tx.add_dataset(identity.into_new_dataset(None))?.id;
                                    created.insert(path, id.clone());
                                    id
                                }
                            },
                        };
                        ids.push(id);
                    }
                    Ok(ids)
                };

                let input_ids = materialize(inputs)?;
                let output_ids = materialize(outputs)?;

                let operation = tx.add_operation(
                    NewOperation::new(OperationKind::Transform, function_name)
                        .with_code(declaration.code_snippet)
                        .with_parameters(declaration.parameters),
                )?;

                let mut edges = Vec::with_capacity(input_ids.len() * output_ids.len());
                for source in &input_ids {
                    for target in &output_ids {
                        edges.push(tx.add_edge(
                            source,
                            target,
                            &operation.id,
                            Some(&relationship),
                        )?);
                    }
                }

                Ok((created, input_ids, output_ids, operation, edges))
            })?;

        let session = self.active_session()?;
        for (path, id) in created {
            session.remember(path, id);
        }
        log::info!(
            "Tracked transformation: {} ({} edge(s))",
            operation.function_name,
            edges.len()
        );

        Ok(DeclaredOperation {
            operation,
            input_ids,
            output_ids,
            edges,
            skipped,
        })
    }

    pub fn summary(&self) -> Result<LineageSummary> {
        Ok(LineageSummary {
            counts: self.store.counts()?,
            datasets: self.store.all_datasets()?,
            operations: self.store.all_operations()?,
            edges: self.store.lineage_edges()?,
        })
    }
}

fn resolve(
    session: &TrackingSession,
    path: &Path,
    chunk_size: usize,
) -> std::result::Result<(PathBuf, Resolved), IdentityError> {
    let canonical = identity::canonical_path(path)?;
    if let Some(id) = session.cached_dataset(&canonical) {
        return Ok((canonical, Resolved::Cached(id.to_string())));
    }
    let identity = identity::identify_canonical(&canonical, chunk_size)?;
    Ok((canonical, Resolved::Fresh(identity)))
}

fn resolve_all(
    session: &TrackingSession,
    paths: &[PathBuf],
    chunk_size: usize,
    skipped: &mut Vec<PathBuf>,
) -> Result<Vec<(PathBuf, Resolved)>> {
    let mut resolved = Vec::with_capacity(paths.len());
    for path in paths {
        match resolve(session, path, chunk_size) {
            Ok(entry) => resolved.push(entry),
            Err(IdentityError::NotFound(missing)) => {
                log::warn!("Could not track {} (not found)", missing.display());
                skipped.push(path.clone());
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(resolved)
}

fn attribution(context: Option<&CallContext>, unknown: &str) -> CallContext {
    match context {
        Some(ctx) if !ctx.function_name.trim().is_empty() => ctx.clone(),
        Some(ctx) => CallContext {
            function_name: unknown.to_string(),
            code_snippet: ctx.code_snippet.clone(),
        },
        None => CallContext::new(unknown),
    }
}
