use indexmap::IndexSet;
use lineage_store::Run;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Working state of one tracking session.
///
/// Owned by a [`crate::Tracker`]; two trackers never share pending reads.
#[derive(Debug)]
pub struct TrackingSession {
    run: Run,

    /// canonical path -> dataset id, never evicted
    identity_cache: HashMap<PathBuf, String>,

    /// reads since the last write, in first-seen order
    pending_reads: IndexSet<PathBuf>,
}

impl TrackingSession {
    pub(crate) fn new(run: Run) -> Self {
        Self {
            run,
            identity_cache: HashMap::new(),
            pending_reads: IndexSet::new(),
        }
    }

    #[must_use]
    pub const fn run(&self) -> &Run {
        &self.run
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run.id
    }

    #[must_use]
    pub fn cached_dataset(&self, path: &Path) -> Option<&str> {
        self.identity_cache.get(path).map(String::as_str)
    }

    /// Number of distinct paths seen in this session
    #[must_use]
    pub fn tracked_paths(&self) -> usize {
        self.identity_cache.len()
    }

    pub fn pending_reads(&self) -> impl Iterator<Item = &Path> {
        self.pending_reads.iter().map(PathBuf::as_path)
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending_reads.len()
    }

    pub(crate) fn remember(&mut self, path: PathBuf, dataset_id: String) {
        self.identity_cache.entry(path).or_insert(dataset_id);
    }

    /// Returns false when the path was already pending.
    pub(crate) fn push_read(&mut self, path: PathBuf) -> bool {
        self.pending_reads.insert(path)
    }

    /// Dataset ids of the pending reads, in window order.
    pub(crate) fn pending_sources(&self) -> Vec<String> {
        self.pending_reads
            .iter()
            .filter_map(|path| self.identity_cache.get(path).cloned())
            .collect()
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending_reads.clear();
    }
}
