//! Logger facade tests

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use skiff_protocol::{Entry, EntryId, Severity};

use crate::{EntrySink, LoggerPool, LoggerPoolOptions};

// ============================================================================
// Helper Functions
// ============================================================================

/// Sink that copies every submitted entry.
#[derive(Default)]
struct CollectSink {
    entries: Mutex<Vec<Entry>>,
    counter: AtomicU32,
    bucket_id: Option<u32>,
}

impl CollectSink {
    fn with_bucket(bucket_id: u32) -> Self {
        Self {
            bucket_id: Some(bucket_id),
            ..Default::default()
        }
    }

    fn take(&self) -> Vec<Entry> {
        std::mem::take(&mut *self.entries.lock())
    }
}

impl EntrySink for CollectSink {
    fn process_entry(&self, entry: &Entry) -> bool {
        self.entries.lock().push(entry.clone());
        true
    }

    fn new_entry_id(&self) -> EntryId {
        EntryId::new(1_700_000_000 + self.counter.fetch_add(1, Ordering::Relaxed))
    }

    fn default_bucket_id(&self) -> Option<u32> {
        self.bucket_id
    }
}

fn pool_with(sink: Arc<CollectSink>, options: LoggerPoolOptions) -> Arc<LoggerPool> {
    LoggerPool::new(sink, options)
}

// ============================================================================
// Sending
// ============================================================================

#[test]
fn test_send_fills_entry() {
    let sink = Arc::new(CollectSink::with_bucket(42));
    let pool = pool_with(Arc::clone(&sink), LoggerPoolOptions::default());
    let log = pool.logger();

    let id = log
        .info("user %s logged in")
        .tag("alice")
        .metric("attempts", 1)
        .meta("ip", "10.0.0.1")
        .send();

    assert!(!id.is_nil());

    let entries = sink.take();
    assert_eq!(entries.len(), 1);

    let entry = &entries[0];
    assert_eq!(entry.bucket_id(), 42);
    assert_eq!(entry.id(), id);
    assert_eq!(entry.severity(), Severity::Info);
    assert_eq!(entry.render(), "user alice logged in");
    assert_eq!(entry.metrics().collect::<Vec<_>>(), vec![("attempts", 1)]);
    assert_eq!(
        entry.meta().collect::<Vec<_>>(),
        vec![("ip", "10.0.0.1")]
    );
}

#[test]
fn test_default_ttls_applied() {
    let sink = Arc::new(CollectSink::default());
    let pool = pool_with(Arc::clone(&sink), LoggerPoolOptions::default());

    pool.logger().info("hello").send();

    let entry = &sink.take()[0];
    assert_eq!(entry.ttl_entry(), 30);
    assert_eq!(entry.ttl_meta(), 30);
}

#[test]
fn test_builder_ttl_overrides_default() {
    let sink = Arc::new(CollectSink::default());
    let pool = pool_with(Arc::clone(&sink), LoggerPoolOptions::default());

    pool.logger().info("hello").ttl(7).send();

    let entry = &sink.take()[0];
    assert_eq!(entry.ttl_entry(), 7);
    assert_eq!(entry.ttl_meta(), 30);
}

#[test]
fn test_logger_defaults_merged_after_builder_fields() {
    let sink = Arc::new(CollectSink::default());
    let pool = pool_with(Arc::clone(&sink), LoggerPoolOptions::default());

    let log = pool
        .logger()
        .with_tag("subsystem")
        .with_meta("region", "eu-1")
        .with_metric("shard", 3)
        .with_category(9);

    log.info("%s finished").tag("job-7").send();

    let entry = &sink.take()[0];
    assert_eq!(entry.tags().collect::<Vec<_>>(), vec!["job-7", "subsystem"]);
    assert_eq!(entry.render(), "job-7 finished");
    assert_eq!(entry.meta().collect::<Vec<_>>(), vec![("region", "eu-1")]);
    assert_eq!(entry.metrics().collect::<Vec<_>>(), vec![("shard", 3)]);
    assert_eq!(entry.category_id(), 9);
}

#[test]
fn test_explicit_bucket_overrides_sink_default() {
    let sink = Arc::new(CollectSink::with_bucket(42));
    let options = LoggerPoolOptions {
        bucket_id: Some(7),
        ..Default::default()
    };
    let pool = pool_with(Arc::clone(&sink), options);

    pool.logger().info("hello").send();

    assert_eq!(sink.take()[0].bucket_id(), 7);
}

// ============================================================================
// Stack Traces
// ============================================================================

#[test]
fn test_severe_entries_capture_caller() {
    let sink = Arc::new(CollectSink::default());
    let pool = pool_with(Arc::clone(&sink), LoggerPoolOptions::default());

    pool.logger().err("boom").send();

    let entry = &sink.take()[0];
    let frames: Vec<_> = entry.stack_trace().collect();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].0.ends_with("logger_test.rs"));
    assert!(frames[0].1 > 0);
}

#[test]
fn test_mild_entries_skip_stack_capture() {
    let sink = Arc::new(CollectSink::default());
    let pool = pool_with(Arc::clone(&sink), LoggerPoolOptions::default());

    pool.logger().info("fine").send();

    let entry = &sink.take()[0];
    assert_eq!(entry.stack_trace().count(), 0);
}

#[test]
fn test_stack_trace_threshold_configurable() {
    let sink = Arc::new(CollectSink::default());
    let options = LoggerPoolOptions {
        stack_trace_severity: Severity::Debug,
        ..Default::default()
    };
    let pool = pool_with(Arc::clone(&sink), options);

    pool.logger().debug("verbose").send();

    let entry = &sink.take()[0];
    assert_eq!(entry.stack_trace().count(), 1);
}

// ============================================================================
// Pooling
// ============================================================================

#[test]
fn test_dropped_builder_returns_entry_without_sending() {
    let sink = Arc::new(CollectSink::default());
    let pool = pool_with(Arc::clone(&sink), LoggerPoolOptions::default());
    let log = pool.logger();

    drop(log.info("never sent").tag("x"));

    assert!(sink.take().is_empty());

    // The recycled entry comes back clean.
    log.info("sent").send();
    let entry = &sink.take()[0];
    assert_eq!(entry.message(), "sent");
    assert_eq!(entry.tags().count(), 0);
}

#[test]
fn test_entries_are_recycled() {
    let sink = Arc::new(CollectSink::default());
    let pool = pool_with(Arc::clone(&sink), LoggerPoolOptions::default());
    let log = pool.logger();

    for i in 0..10 {
        log.info(&format!("entry {i}")).send();
    }

    assert_eq!(sink.take().len(), 10);
}
