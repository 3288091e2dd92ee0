// Behavioural properties of a database across modes and reopen cycles

mod common;

use common::{scan, scan_keys, write_numbered, DbFixture};
use stratakv::{
    CollectionHandle, Database, ErrorKind, KeyValueBatch, KeyValueDb, KeyValueIterator,
    KeyValueReader, OperatingMode, ShutdownStep, WriteDurability,
};

// Generic checks, usable with any backend.

fn check_put_get<D: KeyValueDb>(db: &D) {
    let coll = db.collection("default").expect("default collection");
    db.put(coll, b"alpha", b"1").expect("put");
    assert_eq!(db.get(coll, b"alpha").expect("get"), b"1".to_vec());

    db.put(coll, b"alpha", b"2").expect("overwrite");
    assert_eq!(db.get(coll, b"alpha").expect("get"), b"2".to_vec());

    let err = db.get(coll, b"missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    db.put(coll, b"", b"empty key").expect("empty key");
    assert_eq!(db.get(coll, b"").expect("get"), b"empty key".to_vec());
}

fn check_ascending_scan<'a, D: KeyValueDb>(db: &'a D, coll: CollectionHandle<'a>) {
    for key in ["c", "a", "b"] {
        db.put(coll, key.as_bytes(), key.as_bytes()).expect("put");
    }
    assert_eq!(scan_keys(db, coll, b""), vec!["a", "b", "c"]);
    assert_eq!(scan_keys(db, coll, b"b"), vec!["b", "c"]);
    assert_eq!(scan_keys(db, coll, b"bb"), vec!["c"]);
    assert!(scan_keys(db, coll, b"d").is_empty());
}

fn check_duplicate_collection<D: KeyValueDb>(db: &D) {
    db.create_collection("orders").expect("first create");
    let err = db.create_collection("orders").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Exists);
    let count = db.collections().iter().filter(|n| *n == "orders").count();
    assert_eq!(count, 1);
}

fn check_abandoned_batch<D: KeyValueDb>(db: &D) {
    let coll = db.collection("default").expect("default collection");
    {
        let mut batch = db.begin_writes().expect("begin");
        batch.put(coll, b"ghost-1", b"x").expect("stage");
        batch.put(coll, b"ghost-2", b"x").expect("stage");
        assert_eq!(batch.len(), 2);
    }
    for key in [&b"ghost-1"[..], b"ghost-2"] {
        assert_eq!(db.get(coll, key).unwrap_err().kind(), ErrorKind::NotFound);
    }
}

fn check_read_only_rejects<D: KeyValueDb>(db: &D) {
    assert_eq!(db.mode(), OperatingMode::ReadOnly);
    let coll = db.collection("default").expect("default collection");

    let err = db.put(coll, b"k", b"changed").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    let err = db.create_collection("new").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    let mut batch = db.begin_writes().expect("begin");
    batch.put(coll, b"k", b"changed").expect("staging is allowed");
    batch.put(coll, b"batch-only", b"x").expect("staging is allowed");
    let err = batch.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    assert_eq!(db.get(coll, b"k").expect("get"), b"v".to_vec());
    assert_eq!(
        db.get(coll, b"batch-only").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

// Instantiations for the RocksDB backend.

#[test]
fn test_put_get_round_trip() {
    let fixture = DbFixture::new();
    let db = fixture.initialize();
    check_put_get(&db);
    db.close().expect("close");
}

#[test]
fn test_iteration_is_ascending() {
    let fixture = DbFixture::new();
    let db = fixture.initialize();
    let coll = db.create_collection("letters").expect("create");
    check_ascending_scan(&db, coll);
}

#[test]
fn test_duplicate_collection_is_exists() {
    let fixture = DbFixture::new();
    let db = fixture.initialize();
    check_duplicate_collection(&db);
    db.close().expect("close");

    let db = fixture.open(OperatingMode::Normal);
    let count = db.collections().iter().filter(|n| *n == "orders").count();
    assert_eq!(count, 1);
    assert_eq!(
        db.create_collection("orders").unwrap_err().kind(),
        ErrorKind::Exists
    );
}

#[test]
fn test_default_collection_always_exists() {
    let fixture = DbFixture::new();
    let db = fixture.initialize();
    assert_eq!(
        db.create_collection("default").unwrap_err().kind(),
        ErrorKind::Exists
    );
    db.close().expect("close");

    for mode in OperatingMode::ALL {
        let db = fixture.open(mode);
        assert!(db.collections().contains(&"default".to_string()));
        db.close().expect("close");
    }
}

#[test]
fn test_initialize_existing_and_open_empty() {
    let fixture = DbFixture::new();
    fixture.initialize().close().expect("close");

    let err = Database::initialize_with_policy(fixture.path(), &DbFixture::policy()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Exists);

    let empty = fixture.temp_dir.path().join("empty");
    std::fs::create_dir_all(&empty).expect("mkdir");
    let err = Database::open_with_policy(&empty, OperatingMode::Normal, &DbFixture::policy())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = Database::open_with_policy(
        fixture.temp_dir.path().join("never-created"),
        OperatingMode::ReadOnly,
        &DbFixture::policy(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_read_only_rejects_mutation() {
    let fixture = DbFixture::new();
    {
        let db = fixture.initialize();
        let coll = db.collection("default").expect("default");
        db.put(coll, b"k", b"v").expect("put");
        db.close().expect("close");
    }

    let db = fixture.open(OperatingMode::ReadOnly);
    let before = db.collections();
    check_read_only_rejects(&db);
    assert_eq!(db.collections(), before);
    db.close().expect("close");

    // Nothing reached disk.
    let db = fixture.open(OperatingMode::Normal);
    assert_eq!(db.collections(), before);
    let coll = db.collection("default").expect("default");
    assert_eq!(db.get(coll, b"k").expect("get"), b"v".to_vec());
    assert_eq!(db.get(coll, b"batch-only").unwrap_err().kind(), ErrorKind::NotFound);
}

// These cover batches rejected before reaching the engine. Atomicity when the
// engine itself fails a write rests on `rocksdb::WriteBatch` being applied as
// one unit.
#[test]
fn test_abandoned_batch_leaves_nothing() {
    let fixture = DbFixture::new();
    let db = fixture.initialize();
    check_abandoned_batch(&db);
    db.close().expect("close");

    let db = fixture.open(OperatingMode::Normal);
    let coll = db.collection("default").expect("default");
    assert!(scan(&db, coll, b"").is_empty());
}

#[test]
fn test_batch_commit_is_all_or_nothing_per_batch() {
    let fixture = DbFixture::new();
    let db = fixture.initialize();
    let coll = db.collection("default").expect("default");

    write_numbered(&db, coll, "key", 100);
    assert_eq!(scan(&db, coll, b"").len(), 100);

    let batch = db.begin_writes().expect("begin");
    assert!(batch.is_empty());
    batch.commit().expect("empty commit");
    assert_eq!(scan(&db, coll, b"").len(), 100);
}

#[test]
fn test_normal_close_persists_unflushed_writes() {
    let fixture = DbFixture::new();
    {
        let db = fixture.initialize();
        let users = db.create_collection("users").expect("create");
        for i in 0..50 {
            db.put(users, format!("user{:03}", i).as_bytes(), b"x")
                .expect("put");
        }
        write_numbered(&db, users, "batch", 25);
        db.close().expect("close");
    }

    let db = fixture.open(OperatingMode::Normal);
    let users = db.collection("users").expect("users");
    assert_eq!(scan(&db, users, b"").len(), 75);
    assert_eq!(db.get(users, b"user049").expect("get"), b"x".to_vec());
}

#[test]
fn test_drop_without_close_persists() {
    let fixture = DbFixture::new();
    {
        let db = fixture.initialize();
        let coll = db.collection("default").expect("default");
        db.put(coll, b"dropped", b"still here").expect("put");
    }

    let db = fixture.open(OperatingMode::ReadOnly);
    let coll = db.collection("default").expect("default");
    assert_eq!(db.get(coll, b"dropped").expect("get"), b"still here".to_vec());
}

#[test]
fn test_bulk_load_durable_after_clean_close() {
    let fixture = DbFixture::new();
    fixture.seed(&["events"]);
    {
        let db = fixture.open(OperatingMode::BulkLoad);
        assert_eq!(db.mode(), OperatingMode::BulkLoad);
        let events = db.collection("events").expect("events");
        // Insert out of order; the vector memtable sorts on flush.
        for i in (0..1000u32).rev() {
            db.put(events, format!("ev{:05}", i).as_bytes(), &i.to_le_bytes())
                .expect("put");
        }
        write_numbered(&db, events, "zz", 10);
        db.close().expect("close");
    }

    let db = fixture.open(OperatingMode::ReadOnly);
    let events = db.collection("events").expect("events");
    let entries = scan(&db, events, b"");
    assert_eq!(entries.len(), 1010);
    assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(
        db.get(events, b"ev00042").expect("get"),
        42u32.to_le_bytes().to_vec()
    );
}

#[test]
fn test_bulk_load_can_create_collections() {
    let fixture = DbFixture::new();
    fixture.seed(&[]);
    {
        let db = fixture.open(OperatingMode::BulkLoad);
        let staging = db.create_collection("staging").expect("create");
        db.put(staging, b"k", b"v").expect("put");
        db.close().expect("close");
    }
    let db = fixture.open(OperatingMode::Normal);
    let staging = db.collection("staging").expect("staging");
    assert_eq!(db.get(staging, b"k").expect("get"), b"v".to_vec());
}

#[test]
fn test_iterator_reports_key_and_value() {
    let fixture = DbFixture::new();
    let db = fixture.initialize();
    let coll = db.collection("default").expect("default");
    db.put(coll, b"k1", b"v1").expect("put");
    db.put(coll, b"k2", b"v2").expect("put");

    let reader = db.current().expect("reader");
    let mut iter = reader.iterator(coll, b"").expect("iterator");
    assert!(iter.valid());
    assert_eq!(iter.key(), Some(&b"k1"[..]));
    assert_eq!(iter.value(), Some(&b"v1"[..]));
    iter.next().expect("next");
    assert_eq!(iter.key(), Some(&b"k2"[..]));
    iter.next().expect("next");
    assert!(!iter.valid());
    assert_eq!(iter.key(), None);
    assert_eq!(reader.get(coll, b"k2").expect("get"), b"v2".to_vec());
}

#[test]
fn test_destroy_removes_database() {
    let fixture = DbFixture::new();
    fixture.seed(&["a", "b"]);
    stratakv::destroy(fixture.path()).expect("destroy");
    assert!(!fixture.path().exists());

    let err =
        Database::open_with_policy(fixture.path(), OperatingMode::Normal, &DbFixture::policy())
            .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // The path can hold a fresh database again.
    fixture.initialize().close().expect("close");
}

#[test]
fn test_bulk_load_writes_bypass_wal() {
    let fixture = DbFixture::new();
    fixture.seed(&[]);

    let db = fixture.open(OperatingMode::BulkLoad);
    let writes = db.tuning().writes;
    assert_eq!(writes.single, WriteDurability::Unlogged);
    assert_eq!(writes.batch, WriteDurability::Unlogged);
    assert!(OperatingMode::BulkLoad
        .shutdown_plan()
        .starts_with(&[ShutdownStep::CompactAll]));
    db.close().expect("close");

    let db = fixture.open(OperatingMode::Normal);
    let writes = db.tuning().writes;
    assert_eq!(writes.single, WriteDurability::Logged { sync: false });
    assert_eq!(writes.batch, WriteDurability::Logged { sync: true });
}
