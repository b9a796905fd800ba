use lifedash_core::db::migrations::{current_user_version, latest_version};
use lifedash_core::db::{open_db, open_db_in_memory, DbError};
use lifedash_core::store::keys::{BRAIN_DUMP_ITEMS, PROJECTS};
use lifedash_core::{
    BrainDumpItem, Dashboard, DashboardConfig, FixedClock, KeyValueStore, MemoryBackend,
    PendingMutation, RemoteErrorEnvelope, RemoteStore, SqliteBackend, StoreError, TaskComponent,
    TaskFilters,
};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[test]
fn migrations_are_applied_on_open() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'kv_entries';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn newer_schema_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    {
        let conn = open_db(&path).unwrap();
        conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version() + 1))
            .unwrap();
    }
    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, DbError::SchemaTooNew { .. }));
}

#[test]
fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dash.sqlite3");
    let item = BrainDumpItem::new("water plants", 1);
    {
        let store = KeyValueStore::new(SqliteBackend::open(&path).unwrap());
        store.set(BRAIN_DUMP_ITEMS, &vec![item.clone()]).unwrap();
    }

    let store = KeyValueStore::new(SqliteBackend::open(&path).unwrap());
    let items: Vec<BrainDumpItem> = store.get_collection(BRAIN_DUMP_ITEMS);
    assert_eq!(items, vec![item]);
}

#[test]
fn corrupt_sqlite_value_reads_as_default() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO kv_entries (key, value) VALUES (?1, ?2);",
        [PROJECTS, "[{\"id\": 1,"],
    )
    .unwrap();
    let store = KeyValueStore::new(SqliteBackend::new(conn));
    assert!(store.get_value(PROJECTS).is_none());
    assert_eq!(store.get::<Vec<i64>>(PROJECTS, vec![]), Vec::<i64>::new());
}

#[test]
fn dashboard_opens_file_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = DashboardConfig {
        db_path: Some(dir.path().join("config.sqlite3")),
        ..DashboardConfig::default()
    };
    let dashboard = Dashboard::open(&config).unwrap();
    dashboard.brain_dump.capture("stretch").unwrap();
    let tasks = dashboard
        .hub
        .get_tasks_for_component(TaskComponent::BrainSpace, &TaskFilters::default());
    assert_eq!(tasks.len(), 1);
}

struct FlakyRemote {
    online: Cell<bool>,
    received: RefCell<Vec<PendingMutation>>,
}

impl RemoteStore for FlakyRemote {
    fn remote_id(&self) -> &str {
        "flaky"
    }

    fn push(&self, mutation: &PendingMutation) -> Result<(), RemoteErrorEnvelope> {
        if !self.online.get() {
            return Err(RemoteErrorEnvelope::new("flaky", "network", "offline", true));
        }
        self.received.borrow_mut().push(mutation.clone());
        Ok(())
    }
}

#[test]
fn remote_writes_queue_and_retry_on_next_flush() {
    let clock = Rc::new(FixedClock::new(42, 9));
    let store = KeyValueStore::with_clock(MemoryBackend::new(), clock);
    assert!(store.flush_remote().is_none());

    let remote = Rc::new(FlakyRemote {
        online: Cell::new(false),
        received: RefCell::new(Vec::new()),
    });
    store.attach_remote(remote.clone());

    store.set(PROJECTS, &json!([1])).unwrap();
    store.set(PROJECTS, &json!([1, 2])).unwrap();
    store.set(PROJECTS, &json!([1, 2])).unwrap();
    assert_eq!(store.pending_remote_writes(), 1);

    let report = store.flush_remote().unwrap();
    assert_eq!(report.requeued, 1);
    assert_eq!(store.pending_remote_writes(), 1);
    // Local reads never wait on the remote.
    assert_eq!(store.get::<Vec<u32>>(PROJECTS, vec![]), vec![1, 2]);

    remote.online.set(true);
    store.remove(PROJECTS).unwrap();
    let report = store.flush_remote().unwrap();
    assert_eq!(report.pushed, 1);
    assert_eq!(store.pending_remote_writes(), 0);

    let received = remote.received.borrow();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].key, PROJECTS);
    assert_eq!(received[0].value, None);
    assert_eq!(received[0].attempts, 1);
    assert_eq!(received[0].queued_at_ms, 42);
}

#[test]
fn store_errors_chain_their_source() {
    let err = StoreError::from(serde_json::from_str::<u32>("x").unwrap_err());
    assert!(std::error::Error::source(&err).is_some());
    assert!(err.to_string().contains("serialization"));
}
