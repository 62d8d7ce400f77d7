use crate::codec::{
    decode_json, decode_size, decode_ts, encode_json, encode_size, encode_ts, invalid_text,
};
use crate::error::{Result, StoreError};
use crate::schema;
use crate::types::{
    Dataset, EdgeView, LineageEdge, Metadata, NewDataset, NewOperation, Operation, OperationKind,
    Run, RunStatus, StoreCounts, DEFAULT_RELATIONSHIP,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const DATASET_COLUMNS: &str = "id, filepath, hash, size, format, created_at, metadata";
const OPERATION_COLUMNS: &str =
    "id, operation_type, function_name, code_snippet, parameters, executed_at";
const EDGE_COLUMNS: &str =
    "id, source_id, target_id, operation_id, relationship_type, created_at";
const RUN_COLUMNS: &str = "id, script_path, start_time, end_time, status, metadata";

/// Provenance store backed by a single SQLite connection.
///
/// All access goes through one mutex, so at most one writer touches the
/// database at a time. Share it between tracking sessions with `Arc`.
#[derive(Debug)]
pub struct ProvenanceStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl ProvenanceStore {
    /// Open (or create) the database at `path`, creating parent directories
    /// and the schema as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        let store = Self::from_connection(conn, Some(path))?;
        log::debug!("Opened provenance store at {:?}", store.path);
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        schema::configure(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Backing file, `None` for in-memory stores
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run `f` inside one immediate transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back on `Err`, leaving the store
    /// exactly as it was before the call.
    pub fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&StoreTx<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let handle = StoreTx { tx };

        match f(&handle) {
            Ok(value) => {
                handle.tx.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = handle.tx.rollback() {
                    log::warn!("Rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    pub fn add_dataset(&self, new: NewDataset) -> Result<Dataset> {
        self.transaction(|tx| tx.add_dataset(new))
    }

    pub fn add_operation(&self, new: NewOperation) -> Result<Operation> {
        self.transaction(|tx| tx.add_operation(new))
    }

    /// Link `source_id -> target_id` via `operation_id`.
    ///
    /// Fails with [`StoreError::Integrity`] when any reference is unknown.
    pub fn add_edge(
        &self,
        source_id: &str,
        target_id: &str,
        operation_id: &str,
        relationship: Option<&str>,
    ) -> Result<LineageEdge> {
        self.transaction(|tx| tx.add_edge(source_id, target_id, operation_id, relationship))
    }

    pub fn start_run(&self, script_path: Option<&str>, metadata: Option<Metadata>) -> Result<Run> {
        let run = Run {
            id: new_id(),
            script_path: script_path.map(str::to_string),
            start_time: Utc::now(),
            end_time: None,
            status: RunStatus::Running,
            metadata,
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO runs(id, script_path, start_time, end_time, status, metadata)
             VALUES (?1, ?2, ?3, NULL, ?4, ?5)",
            params![
                run.id,
                run.script_path,
                encode_ts(run.start_time),
                run.status.as_str(),
                encode_json(run.metadata.as_ref())?,
            ],
        )?;
        Ok(run)
    }

    /// Close a run. A run can be closed exactly once.
    pub fn end_run(&self, run_id: &str, status: RunStatus) -> Result<Run> {
        if status == RunStatus::Running {
            return Err(StoreError::InvalidValue(
                "a run cannot be closed with status 'running'".to_string(),
            ));
        }

        self.transaction(|tx| -> Result<Run> {
            let updated = tx.tx.execute(
                "UPDATE runs SET end_time = ?2, status = ?3 WHERE id = ?1 AND end_time IS NULL",
                params![run_id, encode_ts(Utc::now()), status.as_str()],
            )?;

            if updated == 0 {
                return match query_run(&tx.tx, run_id)? {
                    Some(_) => Err(StoreError::RunAlreadyClosed(run_id.to_string())),
                    None => Err(StoreError::integrity("run", run_id)),
                };
            }

            query_run(&tx.tx, run_id)?.ok_or_else(|| StoreError::integrity("run", run_id))
        })
    }

    /// All datasets, newest first.
    pub fn all_datasets(&self) -> Result<Vec<Dataset>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {DATASET_COLUMNS} FROM datasets ORDER BY created_at DESC, rowid DESC"
        );
        collect_rows(&conn, &sql, [], dataset_from_row)
    }

    /// All operations, newest first.
    pub fn all_operations(&self) -> Result<Vec<Operation>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {OPERATION_COLUMNS} FROM operations ORDER BY executed_at DESC, rowid DESC"
        );
        collect_rows(&conn, &sql, [], operation_from_row)
    }

    /// All runs, newest first.
    pub fn all_runs(&self) -> Result<Vec<Run>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {RUN_COLUMNS} FROM runs ORDER BY start_time DESC, rowid DESC");
        collect_rows(&conn, &sql, [], run_from_row)
    }

    /// Raw edge records, oldest first.
    pub fn all_edges(&self) -> Result<Vec<LineageEdge>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {EDGE_COLUMNS} FROM lineage ORDER BY created_at ASC, rowid ASC");
        collect_rows(&conn, &sql, [], edge_from_row)
    }

    /// Flattened lineage view, oldest first.
    pub fn lineage_edges(&self) -> Result<Vec<EdgeView>> {
        let conn = self.lock()?;
        collect_rows(
            &conn,
            "SELECT d1.filepath, d2.filepath, o.function_name, o.operation_type,
                    l.relationship_type, l.created_at
             FROM lineage l
             JOIN datasets d1 ON l.source_id = d1.id
             JOIN datasets d2 ON l.target_id = d2.id
             JOIN operations o ON l.operation_id = o.id
             ORDER BY l.created_at ASC, l.rowid ASC",
            [],
            edge_view_from_row,
        )
    }

    pub fn get_dataset(&self, id: &str) -> Result<Option<Dataset>> {
        let conn = self.lock()?;
        query_dataset(&conn, id)
    }

    pub fn get_operation(&self, id: &str) -> Result<Option<Operation>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {OPERATION_COLUMNS} FROM operations WHERE id = ?1");
        Ok(conn.query_row(&sql, params![id], operation_from_row).optional()?)
    }

    pub fn get_run(&self, id: &str) -> Result<Option<Run>> {
        let conn = self.lock()?;
        query_run(&conn, id)
    }

    /// Every dataset recorded for `filepath`, newest first.
    pub fn datasets_by_path(&self, filepath: &str) -> Result<Vec<Dataset>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {DATASET_COLUMNS} FROM datasets WHERE filepath = ?1
             ORDER BY created_at DESC, rowid DESC"
        );
        collect_rows(&conn, &sql, params![filepath], dataset_from_row)
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        let conn = self.lock()?;
        Ok(StoreCounts {
            datasets: count(&conn, "datasets")?,
            operations: count(&conn, "operations")?,
            edges: count(&conn, "lineage")?,
            runs: count(&conn, "runs")?,
        })
    }

    /// Delete every record. The only path by which datasets disappear.
    pub fn reset(&self) -> Result<()> {
        self.transaction(|tx| {
            tx.tx.execute_batch(
                "DELETE FROM lineage;
                 DELETE FROM operations;
                 DELETE FROM datasets;
                 DELETE FROM runs;",
            )?;
            Ok::<(), StoreError>(())
        })?;
        log::info!("Provenance store reset");
        Ok(())
    }
}

/// Write handle passed to [`ProvenanceStore::transaction`] closures.
pub struct StoreTx<'conn> {
    tx: Transaction<'conn>,
}

impl StoreTx<'_> {
    pub fn add_dataset(&self, new: NewDataset) -> Result<Dataset> {
        let dataset = Dataset {
            id: new_id(),
            filepath: new.filepath,
            hash: new.hash,
            size: new.size,
            format: new.format,
            created_at: Utc::now(),
            metadata: new.metadata,
        };

        self.tx.execute(
            "INSERT INTO datasets(id, filepath, hash, size, format, created_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                dataset.id,
                dataset.filepath,
                dataset.hash,
                encode_size(dataset.size)?,
                dataset.format,
                encode_ts(dataset.created_at),
                encode_json(dataset.metadata.as_ref())?,
            ],
        )?;
        log::debug!("Added dataset {} ({})", dataset.filepath, dataset.id);
        Ok(dataset)
    }

    pub fn add_operation(&self, new: NewOperation) -> Result<Operation> {
        let operation = Operation {
            id: new_id(),
            kind: new.kind,
            function_name: new.function_name,
            code_snippet: new.code_snippet,
            parameters: new.parameters,
            executed_at: new.executed_at.unwrap_or_else(Utc::now),
        };

        self.tx.execute(
            "INSERT INTO operations(id, operation_type, function_name, code_snippet, parameters, executed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                operation.id,
                operation.kind.as_str(),
                operation.function_name,
                operation.code_snippet,
                encode_json(operation.parameters.as_ref())?,
                encode_ts(operation.executed_at),
            ],
        )?;
        Ok(operation)
    }

    pub fn add_edge(
        &self,
        source_id: &str,
        target_id: &str,
        operation_id: &str,
        relationship: Option<&str>,
    ) -> Result<LineageEdge> {
        ensure_exists(&self.tx, "datasets", "dataset", source_id)?;
        ensure_exists(&self.tx, "datasets", "dataset", target_id)?;
        ensure_exists(&self.tx, "operations", "operation", operation_id)?;

        let edge = LineageEdge {
            id: new_id(),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            operation_id: operation_id.to_string(),
            relationship: relationship.unwrap_or(DEFAULT_RELATIONSHIP).to_string(),
            created_at: Utc::now(),
        };

        self.tx.execute(
            "INSERT INTO lineage(id, source_id, target_id, operation_id, relationship_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                edge.id,
                edge.source_id,
                edge.target_id,
                edge.operation_id,
                edge.relationship,
                encode_ts(edge.created_at),
            ],
        )?;
        Ok(edge)
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn ensure_exists(conn: &Connection, table: &str, entity: &'static str, id: &str) -> Result<()> {
    let sql = format!("SELECT 1 FROM {table} WHERE id = ?1");
    let found: Option<i64> = conn
        .query_row(&sql, params![id], |row| row.get(0))
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::integrity(entity, id)),
    }
}

fn count(conn: &Connection, table: &str) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    usize::try_from(n).map_err(|_| StoreError::InvalidValue(format!("negative count in {table}")))
}

fn collect_rows<T, P, F>(conn: &Connection, sql: &str, params: P, map: F) -> Result<Vec<T>>
where
    P: rusqlite::Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
}

fn query_dataset(conn: &Connection, id: &str) -> Result<Option<Dataset>> {
    let sql = format!("SELECT {DATASET_COLUMNS} FROM datasets WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], dataset_from_row).optional()?)
}

fn query_run(conn: &Connection, id: &str) -> Result<Option<Run>> {
    let sql = format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], run_from_row).optional()?)
}

fn dataset_from_row(row: &Row<'_>) -> rusqlite::Result<Dataset> {
    let created_at: String = row.get(5)?;
    Ok(Dataset {
        id: row.get(0)?,
        filepath: row.get(1)?,
        hash: row.get(2)?,
        size: decode_size(3, row.get(3)?)?,
        format: row.get(4)?,
        created_at: decode_ts(5, &created_at)?,
        metadata: decode_json(6, row.get(6)?)?,
    })
}

fn operation_from_row(row: &Row<'_>) -> rusqlite::Result<Operation> {
    let kind: String = row.get(1)?;
    let executed_at: String = row.get(5)?;
    Ok(Operation {
        id: row.get(0)?,
        kind: OperationKind::parse(&kind).ok_or_else(|| invalid_text(1, "operation kind", &kind))?,
        function_name: row.get(2)?,
        code_snippet: row.get(3)?,
        parameters: decode_json(4, row.get(4)?)?,
        executed_at: decode_ts(5, &executed_at)?,
    })
}

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<LineageEdge> {
    let created_at: String = row.get(5)?;
    Ok(LineageEdge {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        operation_id: row.get(3)?,
        relationship: row.get(4)?,
        created_at: decode_ts(5, &created_at)?,
    })
}

fn edge_view_from_row(row: &Row<'_>) -> rusqlite::Result<EdgeView> {
    let kind: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    Ok(EdgeView {
        source: row.get(0)?,
        target: row.get(1)?,
        operation: row.get(2)?,
        operation_kind: OperationKind::parse(&kind)
            .ok_or_else(|| invalid_text(3, "operation kind", &kind))?,
        relationship: row.get(4)?,
        created_at: decode_ts(5, &created_at)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<Run> {
    let start_time: String = row.get(2)?;
    let end_time: Option<String> = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(Run {
        id: row.get(0)?,
        script_path: row.get(1)?,
        start_time: decode_ts(2, &start_time)?,
        end_time: end_time.map(|raw| decode_ts(3, &raw)).transpose()?,
        status: RunStatus::parse(&status).ok_or_else(|| invalid_text(4, "run status", &status))?,
        metadata: decode_json(5, row.get(5)?)?,
    })
}
