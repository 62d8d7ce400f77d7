use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A write referenced an entity that does not exist.
    #[error("Integrity error: {entity} '{id}' does not exist")]
    Integrity { entity: &'static str, id: String },

    #[error("Run '{0}' is already closed")]
    RunAlreadyClosed(String),

    #[error("Unsupported store schema_version {found} (expected {expected})")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn integrity(entity: &'static str, id: impl Into<String>) -> Self {
        Self::Integrity {
            entity,
            id: id.into(),
        }
    }

    #[must_use]
    pub const fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }
}
