#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use stratakv::{
    Database, ErrorKind, HostResources, KeyValueBatch, KeyValueDb, KeyValueIterator,
    KeyValueReader, OperatingMode, TuningConfig, TuningPolicy,
};

const MAX_LEN: usize = 256;

#[derive(Arbitrary, Debug)]
enum DbOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Get { key: Vec<u8> },
    Batch { puts: Vec<(Vec<u8>, Vec<u8>)>, commit: bool },
    Scan { start: Vec<u8> },
    Reopen { bulk: bool },
}

fn policy() -> TuningPolicy {
    TuningPolicy::new(
        TuningConfig::default().with_memtable_budget(8 << 20),
        HostResources::fixed(256 << 20, 2),
    )
}

fn short(bytes: &[u8]) -> bool {
    bytes.len() <= MAX_LEN
}

fuzz_target!(|ops: Vec<DbOp>| {
    let Ok(dir) = tempfile::tempdir() else { return };
    let path = dir.path().join("db");
    let Ok(mut db) = Database::initialize_with_policy(&path, &policy()) else { return };
    let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

    for op in ops.iter().take(64) {
        let coll = db.collection("default").expect("default collection");
        match op {
            DbOp::Put { key, value } if short(key) && short(value) => {
                db.put(coll, key, value).expect("put");
                model.insert(key.clone(), value.clone());
            }
            DbOp::Get { key } if short(key) => match (db.get(coll, key), model.get(key)) {
                (Ok(found), Some(expected)) => assert_eq!(&found, expected),
                (Err(err), None) => assert_eq!(err.kind(), ErrorKind::NotFound),
                (got, want) => panic!("get mismatch: {:?} vs {:?}", got, want),
            },
            DbOp::Batch { puts, commit } => {
                let mut batch = db.begin_writes().expect("begin");
                let staged: Vec<_> = puts
                    .iter()
                    .take(16)
                    .filter(|(k, v)| short(k) && short(v))
                    .collect();
                for (k, v) in &staged {
                    batch.put(coll, k, v).expect("stage");
                }
                if *commit {
                    batch.commit().expect("commit");
                    for (k, v) in staged {
                        model.insert(k.clone(), v.clone());
                    }
                }
            }
            DbOp::Scan { start } if short(start) => {
                let reader = db.current().expect("reader");
                let mut iter = reader.iterator(coll, start).expect("iterator");
                let got = iter.collect_remaining().expect("scan");
                let want: Vec<_> = model
                    .range(start.clone()..)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                assert_eq!(got, want);
            }
            DbOp::Reopen { bulk } => {
                db.close().expect("close");
                let mode = if *bulk {
                    OperatingMode::BulkLoad
                } else {
                    OperatingMode::Normal
                };
                db = Database::open_with_policy(&path, mode, &policy()).expect("reopen");
            }
            _ => {}
        }
    }
});
