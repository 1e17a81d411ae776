//! Auto-commit by modification count and by interval.

use std::thread;
use std::time::{Duration, Instant};

use revdb_common::config::{Revisioning, WriteOptions};
use revdb_common::types::Revision;
use revdb_test::utils::{memory_store, read_value, text};
use revdb_txn::Store;

fn wait_for_revision(store: &Store, revision: u64, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if store.revision_number() >= Revision::new(revision) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_commits_past_modification_threshold() {
    let store = memory_store(Revisioning::Incremental, 4).unwrap();
    let options = WriteOptions::default().with_auto_commit_node_count(3);
    let mut writer = store.begin_write_with(options).unwrap();

    let keys: Vec<_> = (0..3)
        .map(|i| writer.create_node(text(format!("n{i}"))).unwrap())
        .collect();
    assert_eq!(store.revision_number(), Revision::BOOTSTRAP);
    assert_eq!(writer.modification_count().unwrap(), 3);

    // The fourth modification crosses the threshold.
    writer.prepare_for_modification(keys[0]).unwrap().set_value("changed");
    assert_eq!(store.revision_number(), Revision::new(1));
    assert_eq!(writer.modification_count().unwrap(), 0);
    assert_eq!(writer.revision_number().unwrap(), Revision::new(2));

    let reader = store.begin_read(None).unwrap();
    assert_eq!(reader.node_count(), 3);
    assert_eq!(read_value(&reader, keys[0]).unwrap().as_deref(), Some("changed"));
}

#[test]
fn test_removals_count_toward_threshold() {
    let store = memory_store(Revisioning::SlidingSnapshot, 2).unwrap();
    let options = WriteOptions::default().with_auto_commit_node_count(2);
    let mut writer = store.begin_write_with(options).unwrap();

    let a = writer.create_node(text("a")).unwrap();
    writer.create_node(text("b")).unwrap();
    writer.remove_node(a).unwrap();
    assert_eq!(store.revision_number(), Revision::new(1));
    assert_eq!(store.begin_read(None).unwrap().node_count(), 1);
}

#[test]
fn test_interval_commit_publishes() {
    let store = memory_store(Revisioning::Incremental, 4).unwrap();
    let options = WriteOptions::default().with_auto_commit_interval(Duration::from_millis(20));
    let mut writer = store.begin_write_with(options).unwrap();
    let key = writer.create_node(text("timed")).unwrap();

    assert!(wait_for_revision(&store, 1, Duration::from_secs(5)));
    let reader = store.begin_read(None).unwrap();
    assert_eq!(read_value(&reader, key).unwrap().as_deref(), Some("timed"));

    // Idle intervals publish nothing.
    thread::sleep(Duration::from_millis(100));
    assert_eq!(store.revision_number(), Revision::new(1));
    writer.close();
}

#[test]
fn test_interval_waits_for_node_in_flight() {
    let store = memory_store(Revisioning::Incremental, 4).unwrap();
    let mut writer = store.begin_write().unwrap();
    let key = writer.create_node(text("before")).unwrap();
    writer.commit().unwrap();
    writer.close();

    let options = WriteOptions::default().with_auto_commit_interval(Duration::from_millis(10));
    let mut writer = store.begin_write_with(options).unwrap();
    {
        let mut node = writer.prepare_for_modification(key).unwrap();
        node.set_value("during");
        thread::sleep(Duration::from_millis(80));
        assert_eq!(store.revision_number(), Revision::new(1));
    }
    assert!(wait_for_revision(&store, 2, Duration::from_secs(5)));
    let reader = store.begin_read(None).unwrap();
    assert_eq!(read_value(&reader, key).unwrap().as_deref(), Some("during"));
    writer.close();
}

#[test]
fn test_closed_writer_stops_timer() {
    let store = memory_store(Revisioning::Incremental, 4).unwrap();
    let options = WriteOptions::default().with_auto_commit_interval(Duration::from_millis(200));
    let mut writer = store.begin_write_with(options).unwrap();
    writer.create_node(text("discarded")).unwrap();
    writer.close();

    thread::sleep(Duration::from_millis(300));
    assert_eq!(store.revision_number(), Revision::BOOTSTRAP);
    assert!(store.begin_write().is_ok());
}
