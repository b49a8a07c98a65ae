//! End-to-end recovery: commands go through the dispatcher, the process
//! "restarts" by reopening the same AOF, and the store must come back intact.

use bytes::Bytes;
use oxikv::aof::{encode, SyncPolicy};
use oxikv::{AofConfig, AofError, Dispatcher, Operation, RespValue};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn config(path: &Path, appendfsync: SyncPolicy) -> AofConfig {
    AofConfig {
        enabled: true,
        path: path.to_path_buf(),
        appendfsync,
        sync_interval_ms: 10,
    }
}

fn cmd(parts: &[&str]) -> Vec<Bytes> {
    parts
        .iter()
        .map(|p| Bytes::copy_from_slice(p.as_bytes()))
        .collect()
}

fn get(dispatcher: &mut Dispatcher, key: &str) -> RespValue {
    dispatcher.dispatch(&cmd(&["GET", key]))
}

#[test]
fn test_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir.path().join("state.aof"), SyncPolicy::Everysec);

    {
        let mut dispatcher = Dispatcher::open(&config).unwrap();
        dispatcher.dispatch(&cmd(&["SET", "name", "oxikv"]));
        dispatcher.dispatch(&cmd(&["INCRBY", "hits", "41"]));
        dispatcher.dispatch(&cmd(&["INCR", "hits"]));
        dispatcher.dispatch(&cmd(&["HSET", "user:1", "name", "ada", "lang", "rust"]));
        dispatcher.dispatch(&cmd(&["HDEL", "user:1", "lang"]));
        dispatcher.dispatch(&cmd(&["SET", "gone", "x"]));
        dispatcher.dispatch(&cmd(&["DEL", "gone"]));
        dispatcher.shutdown().unwrap();
    }

    let mut dispatcher = Dispatcher::open(&config).unwrap();
    assert_eq!(get(&mut dispatcher, "name"), RespValue::bulk_string("oxikv"));
    assert_eq!(get(&mut dispatcher, "hits"), RespValue::bulk_string("42"));
    assert_eq!(get(&mut dispatcher, "gone"), RespValue::null());
    assert_eq!(
        dispatcher.dispatch(&cmd(&["HGETALL", "user:1"])),
        RespValue::array(vec![
            RespValue::bulk_string("name"),
            RespValue::bulk_string("ada"),
        ])
    );
}

#[test]
fn test_set_set_del_replays_to_empty() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir.path().join("ssd.aof"), SyncPolicy::Always);

    {
        let mut dispatcher = Dispatcher::open(&config).unwrap();
        dispatcher.dispatch(&cmd(&["SET", "a", "1"]));
        dispatcher.dispatch(&cmd(&["SET", "a", "2"]));
        dispatcher.dispatch(&cmd(&["DEL", "a"]));
    }

    let dispatcher = Dispatcher::open(&config).unwrap();
    assert!(dispatcher.context().store.is_empty());
}

#[test]
fn test_torn_tail_is_dropped_and_log_stays_usable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("torn.aof");
    let config = config(&path, SyncPolicy::Always);

    {
        let mut dispatcher = Dispatcher::open(&config).unwrap();
        dispatcher.dispatch(&cmd(&["SET", "a", "1"]));
        dispatcher.dispatch(&cmd(&["SET", "b", "2"]));
    }

    // Half of a frame, as left by a crash in the middle of a write
    let frame = encode(&Operation::new("SET", ["c", "3"]));
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&frame[..frame.len() / 2]).unwrap();
    drop(file);

    {
        let mut dispatcher = Dispatcher::open(&config).unwrap();
        assert_eq!(get(&mut dispatcher, "a"), RespValue::bulk_string("1"));
        assert_eq!(get(&mut dispatcher, "b"), RespValue::bulk_string("2"));
        assert_eq!(get(&mut dispatcher, "c"), RespValue::null());
        dispatcher.dispatch(&cmd(&["SET", "d", "4"]));
    }

    let mut dispatcher = Dispatcher::open(&config).unwrap();
    assert_eq!(get(&mut dispatcher, "d"), RespValue::bulk_string("4"));
    assert_eq!(dispatcher.context().store.len(), 3);
}

#[test]
fn test_corrupt_log_refuses_to_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.aof");
    let first = encode(&Operation::new("SET", ["a", "1"]));
    let second = encode(&Operation::new("SET", ["b", "2"]));

    let mut bytes = first.to_vec();
    let mut damaged = second.to_vec();
    let last = damaged.len() - 1;
    damaged[last] ^= 0xFF;
    bytes.extend_from_slice(&damaged);
    bytes.extend_from_slice(&first);
    std::fs::write(&path, &bytes).unwrap();

    match Dispatcher::open(&config(&path, SyncPolicy::Always)) {
        Err(AofError::Corrupt { offset, .. }) => assert_eq!(offset, first.len() as u64),
        Err(other) => panic!("expected corruption error, got {}", other),
        Ok(_) => panic!("corrupt log was accepted"),
    }

    // The damaged file is left for inspection
    assert_eq!(std::fs::read(&path).unwrap(), bytes);
}

#[test]
fn test_expiry_is_absolute_across_restart() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir.path().join("ttl.aof"), SyncPolicy::Always);

    {
        let mut dispatcher = Dispatcher::open(&config).unwrap();
        dispatcher.dispatch(&cmd(&["SET", "session", "s", "EX", "100"]));
        dispatcher.dispatch(&cmd(&["SET", "short", "s"]));
        dispatcher.dispatch(&cmd(&["EXPIRE", "short", "0"]));
    }

    let mut dispatcher = Dispatcher::open(&config).unwrap();
    match dispatcher.dispatch(&cmd(&["TTL", "session"])) {
        RespValue::Integer(ttl) => assert!((98..=100).contains(&ttl), "ttl was {}", ttl),
        other => panic!("unexpected TTL reply {:?}", other),
    }
    assert_eq!(get(&mut dispatcher, "short"), RespValue::null());
}

#[test]
fn test_rewrite_then_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rewrite.aof");
    let config = config(&path, SyncPolicy::Flush);

    {
        let mut dispatcher = Dispatcher::open(&config).unwrap();
        for i in 0..100 {
            dispatcher.dispatch(&cmd(&["SET", "counter", &i.to_string()]));
        }
        dispatcher.dispatch(&cmd(&["HSET", "h", "f", "v"]));
        dispatcher.dispatch(&cmd(&["EXPIRE", "h", "500"]));
        let before = std::fs::metadata(&path).unwrap().len();

        assert_eq!(
            dispatcher.dispatch(&cmd(&["REWRITEAOF"])),
            RespValue::simple_string("OK")
        );
        assert!(std::fs::metadata(&path).unwrap().len() < before);

        dispatcher.dispatch(&cmd(&["SET", "after", "rewrite"]));
        dispatcher.shutdown().unwrap();
    }

    let mut dispatcher = Dispatcher::open(&config).unwrap();
    assert_eq!(get(&mut dispatcher, "counter"), RespValue::bulk_string("99"));
    assert_eq!(get(&mut dispatcher, "after"), RespValue::bulk_string("rewrite"));
    assert_eq!(
        dispatcher.dispatch(&cmd(&["HGET", "h", "f"])),
        RespValue::bulk_string("v")
    );
    assert!(matches!(
        dispatcher.dispatch(&cmd(&["TTL", "h"])),
        RespValue::Integer(ttl) if ttl > 0
    ));
}

#[test]
fn test_flushdb_is_replayed() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir.path().join("flush.aof"), SyncPolicy::No);

    {
        let mut dispatcher = Dispatcher::open(&config).unwrap();
        dispatcher.dispatch(&cmd(&["SET", "a", "1"]));
        dispatcher.dispatch(&cmd(&["FLUSHDB"]));
        dispatcher.dispatch(&cmd(&["SET", "b", "2"]));
        dispatcher.shutdown().unwrap();
    }

    let mut dispatcher = Dispatcher::open(&config).unwrap();
    assert_eq!(get(&mut dispatcher, "a"), RespValue::null());
    assert_eq!(get(&mut dispatcher, "b"), RespValue::bulk_string("2"));
}
