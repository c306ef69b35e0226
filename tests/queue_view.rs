//! Queue View Behavior Tests
//!
//! Tests for:
//! - Publish / read round trip through `get(index)` and `next`
//! - Forward-only topic scans
//! - Absence is a value, never an error
//! - Unique, strictly increasing indices across threads
//! - Idempotent close

use queueview::log::{FileLog, Log, MemoryLog};
use queueview::queue::{Excerpt, JsonCodec, QueueContext, QueueView};
use queueview::replication::Environment;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u64,
    symbol: String,
}

fn order(id: u64) -> Order {
    Order {
        id,
        symbol: "ACME".to_string(),
    }
}

type OrderView = QueueView<String, Order>;

fn memory_view() -> OrderView {
    QueueView::with_log(
        Arc::new(MemoryLog::new()),
        QueueContext::new("orders"),
        &Environment::new(),
        JsonCodec::new(),
    )
    .expect("view over memory log")
}

fn file_view(dir: &TempDir) -> OrderView {
    let context = QueueContext::new("orders")
        .with_base_path(dir.path())
        .with_sync_on_append(false);
    QueueView::open(context, &Environment::new(), JsonCodec::new()).expect("file-backed view")
}

fn topic(s: &str) -> String {
    s.to_string()
}

// =============================================================================
// Round Trip
// =============================================================================

#[test]
fn test_scenario_publish_get_next() {
    let view = memory_view();

    assert_eq!(view.publish_and_index(&topic("orders"), &order(1)).unwrap(), 0);
    assert_eq!(view.publish_and_index(&topic("orders"), &order(2)).unwrap(), 1);

    assert_eq!(
        view.get(0).unwrap(),
        Some(Excerpt::new(topic("orders"), order(1), 0))
    );

    // Fresh replay cursor for this thread.
    view.release_thread();
    let first = view.next().unwrap().unwrap();
    let second = view.next().unwrap().unwrap();
    assert_eq!((first.index, first.message), (0, order(1)));
    assert_eq!((second.index, second.message), (1, order(2)));
    assert!(view.next().unwrap().is_none());
}

#[test]
fn test_next_sees_records_appended_after_caught_up() {
    let view = memory_view();
    assert!(view.next().unwrap().is_none());

    view.publish(&topic("orders"), &order(7)).unwrap();
    assert_eq!(view.next().unwrap().unwrap().message, order(7));
}

#[test]
fn test_round_trip_on_file_log() {
    let dir = TempDir::new().unwrap();
    let view = file_view(&dir);

    let indices: Vec<u64> = (0..5)
        .map(|i| view.publish_and_index(&topic("orders"), &order(i)).unwrap())
        .collect();

    for (i, index) in indices.iter().enumerate() {
        let excerpt = view.get(*index).unwrap().unwrap();
        assert_eq!(excerpt.index, *index);
        assert_eq!(excerpt.message, order(i as u64));
    }
    assert!(dir.path().join("orders").join("queue.log").exists());
}

// =============================================================================
// Topic Scan
// =============================================================================

#[test]
fn test_scan_returns_first_match_and_never_wraps() {
    let view = memory_view();
    for (i, t) in ["A", "B", "A", "C"].iter().enumerate() {
        view.publish(&topic(t), &order(i as u64)).unwrap();
    }

    let first = view.get_topic(&topic("A")).unwrap().unwrap();
    assert_eq!(first.index, 0);
    assert_eq!(first.topic, "A");

    let second = view.get_topic(&topic("A")).unwrap().unwrap();
    assert_eq!(second.index, 2);

    // Everything after index 2 has been consumed by the scan.
    assert!(view.get_topic(&topic("A")).unwrap().is_none());
    assert!(view.get_topic(&topic("C")).unwrap().is_none());
}

#[test]
fn test_scan_after_rewind_starts_over() {
    let view = memory_view();
    for t in ["A", "B", "C"] {
        view.publish(&topic(t), &order(0)).unwrap();
    }

    assert_eq!(view.get_topic(&topic("C")).unwrap().unwrap().index, 2);
    assert!(view.get_topic(&topic("B")).unwrap().is_none());

    view.rewind().unwrap();
    assert_eq!(view.get_topic(&topic("B")).unwrap().unwrap().index, 1);
}

#[test]
fn test_scan_continues_from_get_position() {
    let view = memory_view();
    for t in ["A", "B", "A"] {
        view.publish(&topic(t), &order(0)).unwrap();
    }

    view.get(1).unwrap();
    assert_eq!(view.get_topic(&topic("A")).unwrap().unwrap().index, 2);
}

// =============================================================================
// Absence
// =============================================================================

#[test]
fn test_get_beyond_last_index_is_absent() {
    let view = memory_view();
    view.publish(&topic("orders"), &order(1)).unwrap();

    let beyond = view.last_index().unwrap() + 1;
    assert!(view.get(beyond).unwrap().is_none());
    assert!(view.try_get(beyond).unwrap().is_none());
}

#[test]
fn test_get_before_first_index_after_clear_is_absent() {
    let view = memory_view();
    view.publish(&topic("orders"), &order(1)).unwrap();
    view.publish(&topic("orders"), &order(2)).unwrap();
    view.clear().unwrap();
    view.publish(&topic("orders"), &order(3)).unwrap();

    assert!(view.get(0).unwrap().is_none());
    assert_eq!(view.get(2).unwrap().unwrap().message, order(3));
    assert_eq!(view.first_index(), Some(2));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_publishers_get_unique_increasing_indices() {
    let view = Arc::new(memory_view());
    let threads = 8;
    let per_thread = 200;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let view = Arc::clone(&view);
            thread::spawn(move || {
                let mut indices = Vec::with_capacity(per_thread);
                for i in 0..per_thread {
                    let id = (t * per_thread + i) as u64;
                    indices.push(view.publish_and_index(&topic("orders"), &order(id)).unwrap());
                }
                indices
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        let indices = handle.join().unwrap();
        // Each thread observes its own indices in increasing order.
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        for index in indices {
            assert!(all.insert(index), "index {} assigned twice", index);
        }
    }

    let total = (threads * per_thread) as u64;
    assert_eq!(all.len() as u64, total);
    assert_eq!(view.last_index(), Some(total - 1));
}

#[test]
fn test_readers_on_separate_threads_see_increasing_indices() {
    let view = Arc::new(memory_view());
    for i in 0..50 {
        view.publish(&topic("orders"), &order(i)).unwrap();
    }

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let view = Arc::clone(&view);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(excerpt) = view.next().unwrap() {
                    seen.push(excerpt.index);
                }
                seen
            })
        })
        .collect();

    for reader in readers {
        let seen = reader.join().unwrap();
        assert_eq!(seen, (0..50).collect::<Vec<u64>>());
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_close_twice_leaves_log_closed() {
    let log = MemoryLog::new();
    let view: OrderView = QueueView::with_log(
        Arc::new(log.clone()),
        QueueContext::new("orders"),
        &Environment::new(),
        JsonCodec::new(),
    )
    .unwrap();

    view.close().unwrap();
    view.close().unwrap();
    assert!(log.is_closed());
    assert!(view.get(0).is_err());
}

#[test]
fn test_reopen_file_view_keeps_records() {
    let dir = TempDir::new().unwrap();
    {
        let view = file_view(&dir);
        view.publish(&topic("orders"), &order(1)).unwrap();
        view.publish(&topic("fills"), &order(2)).unwrap();
        view.close().unwrap();
    }

    let view = file_view(&dir);
    assert_eq!(view.last_index(), Some(1));
    assert_eq!(view.get_topic(&topic("fills")).unwrap().unwrap().message, order(2));
    assert_eq!(view.publish_and_index(&topic("orders"), &order(3)).unwrap(), 2);
}

#[test]
fn test_dump_renders_every_record() {
    let dir = TempDir::new().unwrap();
    let view = file_view(&dir);
    view.publish(&topic("orders"), &order(1)).unwrap();
    view.set(&order(2)).unwrap();

    let dump = view.dump().unwrap();
    assert!(dump.lines().next().unwrap().starts_with("# log:"));
    assert!(dump.contains("0: orders = "));
    assert!(dump.contains("1:  = "));

    let log = FileLog::open(&dir.path().join("orders").join("queue.log"));
    // The view still holds the file; a second handle reads the same records.
    assert_eq!(log.unwrap().last_index(), Some(1));
}
