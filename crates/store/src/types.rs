use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Free-form JSON object attached to datasets, operations and runs.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Relationship label used when the caller does not supply one.
pub const DEFAULT_RELATIONSHIP: &str = "derived_from";

/// Kind of recorded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Write,
    Transform,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Transform => "transform",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "transform" => Some(Self::Transform),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a tracking run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed file state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,

    /// Canonical absolute path
    pub filepath: String,

    /// Hex SHA-256 of the file contents
    pub hash: String,

    pub size: u64,

    /// Lower-cased extension, if any
    pub format: Option<String>,

    pub created_at: DateTime<Utc>,

    pub metadata: Option<Metadata>,
}

impl Dataset {
    /// Last path component, used as the display label.
    #[must_use]
    pub fn file_name(&self) -> &str {
        display_name(&self.filepath)
    }
}

/// Insert payload for [`Dataset`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDataset {
    pub filepath: String,
    pub hash: String,
    pub size: u64,
    pub format: Option<String>,
    pub metadata: Option<Metadata>,
}

impl NewDataset {
    pub fn new(filepath: impl Into<String>, hash: impl Into<String>, size: u64) -> Self {
        Self {
            filepath: filepath.into(),
            hash: hash.into(),
            size,
            format: None,
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: Option<String>) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Option<Metadata>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One recorded transformation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub kind: OperationKind,

    /// Function or context the operation is attributed to
    pub function_name: String,

    pub code_snippet: Option<String>,
    pub parameters: Option<Metadata>,
    pub executed_at: DateTime<Utc>,
}

/// Insert payload for [`Operation`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOperation {
    pub kind: OperationKind,
    pub function_name: String,
    pub code_snippet: Option<String>,
    pub parameters: Option<Metadata>,

    /// Defaults to the insert time
    pub executed_at: Option<DateTime<Utc>>,
}

impl NewOperation {
    pub fn new(kind: OperationKind, function_name: impl Into<String>) -> Self {
        Self {
            kind,
            function_name: function_name.into(),
            code_snippet: None,
            parameters: None,
            executed_at: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code_snippet: Option<String>) -> Self {
        self.code_snippet = code_snippet;
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Option<Metadata>) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn executed_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.executed_at = at;
        self
    }
}

/// Directed link `source -> target` produced by one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub operation_id: String,
    pub relationship: String,
    pub created_at: DateTime<Utc>,
}

/// Flattened lineage row: edge joined with both dataset paths and its operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub operation: String,
    pub operation_kind: OperationKind,
    pub relationship: String,
    pub created_at: DateTime<Utc>,
}

impl EdgeView {
    #[must_use]
    pub fn source_name(&self) -> &str {
        display_name(&self.source)
    }

    #[must_use]
    pub fn target_name(&self) -> &str {
        display_name(&self.target)
    }
}

/// Bounded tracking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub script_path: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub datasets: usize,
    pub operations: usize,
    pub edges: usize,
    pub runs: usize,
}

fn display_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}
