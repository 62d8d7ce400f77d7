use lineage_store::{
    NewDataset, NewOperation, OperationKind, ProvenanceStore, RunStatus, StoreCounts, StoreError,
};
use pretty_assertions::assert_eq;
use std::thread::sleep;
use std::time::Duration;

fn store() -> ProvenanceStore {
    ProvenanceStore::open_in_memory().expect("in-memory store")
}

fn tick() {
    sleep(Duration::from_millis(5));
}

#[test]
fn fresh_store_is_empty() {
    let store = store();
    assert!(store.all_datasets().unwrap().is_empty());
    assert!(store.all_operations().unwrap().is_empty());
    assert!(store.lineage_edges().unwrap().is_empty());
    assert!(store.all_runs().unwrap().is_empty());
    assert_eq!(store.counts().unwrap(), StoreCounts::default());
}

#[test]
fn ids_are_unique_uuids() {
    let store = store();
    let a = store.add_dataset(NewDataset::new("/d/a.csv", "aa", 1)).unwrap();
    let b = store.add_dataset(NewDataset::new("/d/a.csv", "aa", 1)).unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(a.id.len(), 36);
    assert!(uuid_like(&b.id), "not a uuid: {}", b.id);
}

fn uuid_like(id: &str) -> bool {
    id.split('-').map(str::len).collect::<Vec<_>>() == vec![8, 4, 4, 4, 12]
}

#[test]
fn dataset_round_trips_with_metadata() {
    let store = store();
    let mut meta = serde_json::Map::new();
    meta.insert("rows".to_string(), serde_json::json!(3));

    let created = store
        .add_dataset(
            NewDataset::new("/data/raw.csv", "abc123", 1024)
                .with_format(Some("csv".to_string()))
                .with_metadata(Some(meta)),
        )
        .unwrap();

    let loaded = store.get_dataset(&created.id).unwrap().expect("dataset");
    assert_eq!(loaded, created);
    assert_eq!(loaded.file_name(), "raw.csv");
}

#[test]
fn operations_and_runs_are_fetched_by_id() {
    let store = store();
    let op = store
        .add_operation(
            NewOperation::new(OperationKind::Transform, "clean")
                .with_code(Some("df.dropna()".to_string())),
        )
        .unwrap();
    let run = store.start_run(Some("pipeline.py"), None).unwrap();

    assert_eq!(store.get_operation(&op.id).unwrap(), Some(op));
    assert_eq!(store.get_run(&run.id).unwrap(), Some(run));
    assert_eq!(store.get_operation("missing").unwrap(), None);
    assert_eq!(store.get_run("missing").unwrap(), None);
}

#[test]
fn datasets_and_operations_are_listed_newest_first() {
    let store = store();
    let mut ids = Vec::new();
    for name in ["first.csv", "second.csv", "third.csv"] {
        ids.push(
            store
                .add_dataset(NewDataset::new(format!("/d/{name}"), "00", 1))
                .unwrap()
                .id,
        );
        tick();
    }

    let listed: Vec<String> = store
        .all_datasets()
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    ids.reverse();
    assert_eq!(listed, ids);

    for name in ["load", "clean", "save"] {
        store
            .add_operation(NewOperation::new(OperationKind::Transform, name))
            .unwrap();
        tick();
    }
    let names: Vec<String> = store
        .all_operations()
        .unwrap()
        .into_iter()
        .map(|op| op.function_name)
        .collect();
    assert_eq!(names, vec!["save", "clean", "load"]);
}

#[test]
fn lineage_edges_are_listed_oldest_first() {
    let store = store();
    let a = store.add_dataset(NewDataset::new("/d/a.csv", "a", 1)).unwrap();
    let b = store.add_dataset(NewDataset::new("/d/b.csv", "b", 1)).unwrap();
    let c = store.add_dataset(NewDataset::new("/d/c.csv", "c", 1)).unwrap();
    let d = store.add_dataset(NewDataset::new("/d/d.csv", "d", 1)).unwrap();
    let op = store
        .add_operation(NewOperation::new(OperationKind::Write, "step"))
        .unwrap();

    for (src, dst) in [(&a, &b), (&b, &c), (&c, &d)] {
        store.add_edge(&src.id, &dst.id, &op.id, None).unwrap();
        tick();
    }

    let edges = store.lineage_edges().unwrap();
    let pairs: Vec<(&str, &str)> = edges
        .iter()
        .map(|e| (e.source_name(), e.target_name()))
        .collect();
    assert_eq!(
        pairs,
        vec![("a.csv", "b.csv"), ("b.csv", "c.csv"), ("c.csv", "d.csv")]
    );
    assert!(edges.iter().all(|e| e.relationship == "derived_from"));
    assert!(edges.iter().all(|e| e.operation_kind == OperationKind::Write));
    assert!(edges[0].created_at < edges[2].created_at);
}

#[test]
fn duplicate_edges_are_kept() {
    let store = store();
    let a = store.add_dataset(NewDataset::new("/d/a.csv", "a", 1)).unwrap();
    let b = store.add_dataset(NewDataset::new("/d/b.csv", "b", 1)).unwrap();
    let op = store
        .add_operation(NewOperation::new(OperationKind::Transform, "copy"))
        .unwrap();

    store.add_edge(&a.id, &b.id, &op.id, None).unwrap();
    store.add_edge(&a.id, &b.id, &op.id, None).unwrap();
    assert_eq!(store.all_edges().unwrap().len(), 2);
}

#[test]
fn edge_with_unknown_operation_is_an_integrity_error() {
    let store = store();
    let a = store.add_dataset(NewDataset::new("/d/a.csv", "a", 1)).unwrap();
    let b = store.add_dataset(NewDataset::new("/d/b.csv", "b", 1)).unwrap();

    let err = store.add_edge(&a.id, &b.id, "nope", None).unwrap_err();
    match err {
        StoreError::Integrity { entity, id } => {
            assert_eq!(entity, "operation");
            assert_eq!(id, "nope");
        }
        other => panic!("expected integrity error, got {other}"),
    }
}

#[test]
fn failed_transaction_rolls_back_every_write() {
    let store = store();

    let result = store.transaction(|tx| {
        let a = tx.add_dataset(NewDataset::new("/d/a.csv", "a", 1))?;
        let b = tx.add_dataset(NewDataset::new("/d/b.csv", "b", 1))?;
        let op = tx.add_operation(NewOperation::new(OperationKind::Transform, "join"))?;
        tx.add_edge(&a.id, &b.id, &op.id, None)?;
        tx.add_edge(&a.id, "ghost", &op.id, None)?;
        Ok::<_, StoreError>(())
    });

    assert!(result.unwrap_err().is_integrity());
    assert_eq!(store.counts().unwrap(), StoreCounts::default());
}

#[test]
fn run_is_closed_exactly_once() {
    let store = store();
    let run = store.start_run(Some("pipeline.py"), None).unwrap();
    assert_eq!(run.status, RunStatus::Running);
    assert!(run.end_time.is_none());

    let closed = store.end_run(&run.id, RunStatus::Completed).unwrap();
    assert_eq!(closed.status, RunStatus::Completed);
    assert!(closed.end_time.is_some());
    assert_eq!(closed.script_path.as_deref(), Some("pipeline.py"));

    assert!(matches!(
        store.end_run(&run.id, RunStatus::Failed),
        Err(StoreError::RunAlreadyClosed(_))
    ));
    assert!(store.end_run("missing", RunStatus::Completed).unwrap_err().is_integrity());
    assert!(matches!(
        store.end_run(&run.id, RunStatus::Running),
        Err(StoreError::InvalidValue(_))
    ));
}

#[test]
fn reset_clears_all_entities() {
    let store = store();
    let a = store.add_dataset(NewDataset::new("/d/a.csv", "a", 1)).unwrap();
    let b = store.add_dataset(NewDataset::new("/d/b.csv", "b", 1)).unwrap();
    let op = store
        .add_operation(NewOperation::new(OperationKind::Transform, "f"))
        .unwrap();
    store.add_edge(&a.id, &b.id, &op.id, None).unwrap();
    store.start_run(None, None).unwrap();

    store.reset().unwrap();
    assert_eq!(store.counts().unwrap(), StoreCounts::default());
}

#[test]
fn datasets_by_path_returns_every_record_for_a_path() {
    let store = store();
    store.add_dataset(NewDataset::new("/d/a.csv", "v1", 1)).unwrap();
    tick();
    store.add_dataset(NewDataset::new("/d/a.csv", "v2", 2)).unwrap();
    store.add_dataset(NewDataset::new("/d/b.csv", "b", 1)).unwrap();

    let hashes: Vec<String> = store
        .datasets_by_path("/d/a.csv")
        .unwrap()
        .into_iter()
        .map(|d| d.hash)
        .collect();
    assert_eq!(hashes, vec!["v2", "v1"]);
}
