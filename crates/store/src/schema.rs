use crate::error::{Result, StoreError};
use rusqlite::{params, Connection, OptionalExtension};

pub const STORE_SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS datasets (
    id TEXT PRIMARY KEY,
    filepath TEXT NOT NULL,
    hash TEXT NOT NULL,
    size INTEGER NOT NULL,
    format TEXT,
    created_at TEXT NOT NULL,
    metadata TEXT
);
CREATE INDEX IF NOT EXISTS idx_datasets_filepath ON datasets(filepath);

CREATE TABLE IF NOT EXISTS operations (
    id TEXT PRIMARY KEY,
    operation_type TEXT NOT NULL,
    function_name TEXT NOT NULL,
    code_snippet TEXT,
    parameters TEXT,
    executed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lineage (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL REFERENCES datasets(id),
    target_id TEXT NOT NULL REFERENCES datasets(id),
    operation_id TEXT NOT NULL REFERENCES operations(id),
    relationship_type TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_lineage_target ON lineage(target_id);

CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    script_path TEXT,
    start_time TEXT NOT NULL,
    end_time TEXT,
    status TEXT NOT NULL,
    metadata TEXT
);
";

pub(crate) fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub(crate) fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        None => {
            conn.execute(
                "INSERT INTO meta(key, value) VALUES ('schema_version', ?1)",
                params![STORE_SCHEMA_VERSION.to_string()],
            )?;
        }
        Some(raw) => {
            let found = raw.parse::<u32>().map_err(|_| {
                StoreError::InvalidValue(format!("schema_version is not a number: {raw}"))
            })?;
            if found != STORE_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    found,
                    expected: STORE_SCHEMA_VERSION,
                });
            }
        }
    }

    Ok(())
}
