//! End-to-end scenarios over a fresh store.

use revdb_common::config::Revisioning;
use revdb_common::constants::NODE_PAGE_SLOTS;
use revdb_common::types::{NodeKey, Revision};
use revdb_test::utils::{memory_store, read_value, text};

#[test]
fn test_first_commit_is_revision_one() {
    let store = memory_store(Revisioning::Incremental, 4).unwrap();
    assert_eq!(store.revision_number(), Revision::BOOTSTRAP);

    let mut writer = store.begin_write().unwrap();
    let key = writer.create_node(text("only")).unwrap();
    let published = writer.commit().unwrap();
    writer.close();

    assert_eq!(published.revision_number(), Revision::new(1));
    let reader = store.begin_read(None).unwrap();
    assert_eq!(reader.revision_number(), Revision::new(1));
    assert_eq!(reader.node_count(), 1);
    assert_eq!(read_value(&reader, key).unwrap().as_deref(), Some("only"));
}

#[test]
fn test_historical_read_ignores_later_revisions() {
    let store = memory_store(Revisioning::SlidingSnapshot, 4).unwrap();
    let mut writer = store.begin_write().unwrap();
    let mut keys = Vec::new();
    for i in 1..=5 {
        keys.push(writer.create_node(text(format!("r{i}"))).unwrap());
        writer.commit().unwrap();
    }
    writer.close();

    let reader = store.begin_read(Some(3)).unwrap();
    assert_eq!(reader.revision_number(), Revision::new(3));
    assert_eq!(reader.node_count(), 3);
    assert_eq!(read_value(&reader, keys[2]).unwrap().as_deref(), Some("r3"));
    assert_eq!(read_value(&reader, keys[3]).unwrap(), None);
    assert_eq!(read_value(&reader, keys[4]).unwrap(), None);
}

#[test]
fn test_large_insert_crosses_page_boundaries() {
    const COUNT: u64 = 300_000;

    let store = memory_store(Revisioning::Incremental, 4).unwrap();
    let mut writer = store.begin_write().unwrap();
    for i in 0..COUNT {
        let key = writer.create_node(text(i.to_string())).unwrap();
        assert_eq!(key, NodeKey::new(i));
    }
    let published = writer.commit().unwrap();
    let stats = writer.last_commit_stats().unwrap();
    writer.close();

    let pages = COUNT.div_ceil(NODE_PAGE_SLOTS as u64) as usize;
    assert_eq!(stats.node_pages, pages);
    assert_eq!(published.max_node_key(), NodeKey::new(COUNT - 1));

    let reader = store.begin_read(None).unwrap();
    assert_eq!(reader.node_count(), COUNT);
    for i in 0..COUNT {
        let expected = i.to_string();
        assert_eq!(
            read_value(&reader, NodeKey::new(i)).unwrap().as_deref(),
            Some(expected.as_str()),
            "node {i}"
        );
    }
    assert_eq!(read_value(&reader, NodeKey::new(COUNT)).unwrap(), None);
}

#[test]
fn test_sliding_window_keeps_modifications_visible() {
    const WINDOW: u32 = 4;

    let store = memory_store(Revisioning::SlidingSnapshot, WINDOW).unwrap();
    let mut writer = store.begin_write().unwrap();
    let shared = writer.create_node(text("v1")).unwrap();
    let untouched = writer.create_node(text("stable")).unwrap();
    writer.commit().unwrap();

    for revision in 2..=10 {
        let mut node = writer.prepare_for_modification(shared).unwrap();
        node.set_value(format!("v{revision}"));
        drop(node);
        writer.commit().unwrap();
    }
    writer.close();
    assert_eq!(store.revision_number(), Revision::new(10));

    for revision in 6..=10u64 {
        let reader = store.begin_read(Some(revision)).unwrap();
        let expected = format!("v{revision}");
        assert_eq!(
            read_value(&reader, shared).unwrap().as_deref(),
            Some(expected.as_str())
        );
        // Written only in revision 1, far outside the window, yet carried
        // forward into every later version of the page.
        assert_eq!(
            read_value(&reader, untouched).unwrap().as_deref(),
            Some("stable")
        );
        assert!(reader.cache_stats().misses() <= 1);
    }
}

#[test]
fn test_names_are_interned_per_revision() {
    let store = memory_store(Revisioning::Incremental, 2).unwrap();
    let mut writer = store.begin_write().unwrap();
    let book = writer.intern_name("book").unwrap();
    let title = writer.intern_name("title").unwrap();
    assert_ne!(book, title);
    assert_eq!(writer.intern_name("book").unwrap(), book);
    writer.commit().unwrap();
    writer.close();

    let reader = store.begin_read(None).unwrap();
    assert_eq!(reader.get_name(book).unwrap().as_deref(), Some("book"));
    assert_eq!(reader.get_name(title).unwrap().as_deref(), Some("title"));

    let bootstrap = store.begin_read(Some(0)).unwrap();
    assert_eq!(bootstrap.get_name(book).unwrap(), None);
}
