//! Logger pool and entry free-list

use std::sync::Arc;

use parking_lot::Mutex;
use skiff_client::TlsClient;
use skiff_protocol::{Entry, EntryId, Severity};

use crate::{DEFAULT_ENTRY_TTL_DAYS, EntryBuilder};

/// Where finished entries go. Implemented by
/// [`TlsClient`](skiff_client::TlsClient); tests substitute their own.
pub trait EntrySink: Send + Sync {
    /// Enqueue one entry for delivery. Returns false when the sink no
    /// longer accepts entries.
    fn process_entry(&self, entry: &Entry) -> bool;

    /// A fresh entry id stamped with the sink's clock.
    fn new_entry_id(&self) -> EntryId;

    /// Bucket id to use when the pool options leave it unset.
    fn default_bucket_id(&self) -> Option<u32> {
        None
    }
}

impl EntrySink for TlsClient {
    fn process_entry(&self, entry: &Entry) -> bool {
        TlsClient::process_entry(self, entry)
    }

    fn new_entry_id(&self) -> EntryId {
        TlsClient::new_entry_id(self)
    }

    fn default_bucket_id(&self) -> Option<u32> {
        self.bucket_id()
    }
}

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct LoggerPoolOptions {
    /// Bucket id stamped on every entry. Falls back to the sink's default
    /// (the client certificate's single bucket) and then to zero.
    pub bucket_id: Option<u32>,

    /// Default entry TTL in days.
    pub default_entry_ttl: u16,

    /// Default meta TTL in days; the entry TTL when unset.
    pub default_meta_ttl: Option<u16>,

    /// Severities at or above this capture the calling location.
    pub stack_trace_severity: Severity,
}

impl Default for LoggerPoolOptions {
    fn default() -> Self {
        Self {
            bucket_id: None,
            default_entry_ttl: DEFAULT_ENTRY_TTL_DAYS,
            default_meta_ttl: None,
            stack_trace_severity: Severity::Notice,
        }
    }
}

/// Shared pool of entries plus the delivery sink.
pub struct LoggerPool {
    sink: Arc<dyn EntrySink>,
    free: Mutex<Vec<Entry>>,
    bucket_id: u32,
    default_entry_ttl: u16,
    default_meta_ttl: u16,
    stack_trace_severity: Severity,
}

impl LoggerPool {
    pub fn new(sink: Arc<dyn EntrySink>, options: LoggerPoolOptions) -> Arc<Self> {
        let bucket_id = options
            .bucket_id
            .or_else(|| sink.default_bucket_id())
            .unwrap_or(0);

        Arc::new(Self {
            sink,
            free: Mutex::new(Vec::new()),
            bucket_id,
            default_entry_ttl: options.default_entry_ttl,
            default_meta_ttl: options.default_meta_ttl.unwrap_or(options.default_entry_ttl),
            stack_trace_severity: options.stack_trace_severity,
        })
    }

    /// A logger with the pool's defaults and no extra context.
    pub fn logger(self: &Arc<Self>) -> Logger {
        Logger {
            pool: Arc::clone(self),
            tags: Vec::new(),
            meta: Vec::new(),
            metrics: Vec::new(),
            category_id: None,
            ttl_entry: self.default_entry_ttl,
            ttl_meta: self.default_meta_ttl,
        }
    }

    /// Take a reset entry from the free-list.
    pub(crate) fn acquire(&self) -> Entry {
        self.free.lock().pop().unwrap_or_default()
    }

    /// Return an entry to the free-list.
    pub(crate) fn release(&self, mut entry: Entry) {
        entry.reset();
        self.free.lock().push(entry);
    }

    pub(crate) fn sink(&self) -> &dyn EntrySink {
        self.sink.as_ref()
    }

    pub(crate) fn bucket_id(&self) -> u32 {
        self.bucket_id
    }

    pub(crate) fn stack_trace_severity(&self) -> Severity {
        self.stack_trace_severity
    }
}

/// A handle that accumulates defaults merged into every entry it sends.
///
/// Cloning (or deriving with the `with_*` methods) is cheap; loggers share
/// the pool behind an `Arc`.
#[derive(Clone)]
pub struct Logger {
    pub(crate) pool: Arc<LoggerPool>,
    pub(crate) tags: Vec<String>,
    pub(crate) meta: Vec<(String, String)>,
    pub(crate) metrics: Vec<(String, i32)>,
    pub(crate) category_id: Option<u8>,
    pub(crate) ttl_entry: u16,
    pub(crate) ttl_meta: u16,
}

impl Logger {
    /// Derive a logger with an extra default tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Derive a logger with an extra default meta pair.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.push((key.into(), value.into()));
        self
    }

    /// Derive a logger with an extra default metric.
    pub fn with_metric(mut self, key: impl Into<String>, value: i32) -> Self {
        self.metrics.push((key.into(), value));
        self
    }

    /// Derive a logger with a default category.
    pub fn with_category(mut self, category_id: u8) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Derive a logger with a different entry TTL.
    pub fn with_entry_ttl(mut self, days: u16) -> Self {
        self.ttl_entry = days;
        self
    }

    /// Derive a logger with a different meta TTL.
    pub fn with_meta_ttl(mut self, days: u16) -> Self {
        self.ttl_meta = days;
        self
    }

    // ------------------------------------------------------------------
    // Severity helpers
    // ------------------------------------------------------------------

    #[track_caller]
    pub fn emerg(&self, message: &str) -> EntryBuilder<'_> {
        self.entry(Severity::Emerg, message)
    }

    #[track_caller]
    pub fn alert(&self, message: &str) -> EntryBuilder<'_> {
        self.entry(Severity::Alert, message)
    }

    #[track_caller]
    pub fn crit(&self, message: &str) -> EntryBuilder<'_> {
        self.entry(Severity::Crit, message)
    }

    #[track_caller]
    pub fn err(&self, message: &str) -> EntryBuilder<'_> {
        self.entry(Severity::Err, message)
    }

    #[track_caller]
    pub fn warning(&self, message: &str) -> EntryBuilder<'_> {
        self.entry(Severity::Warning, message)
    }

    #[track_caller]
    pub fn notice(&self, message: &str) -> EntryBuilder<'_> {
        self.entry(Severity::Notice, message)
    }

    #[track_caller]
    pub fn info(&self, message: &str) -> EntryBuilder<'_> {
        self.entry(Severity::Info, message)
    }

    #[track_caller]
    pub fn debug(&self, message: &str) -> EntryBuilder<'_> {
        self.entry(Severity::Debug, message)
    }

    /// Start an entry with an explicit severity.
    #[track_caller]
    pub fn entry(&self, severity: Severity, message: &str) -> EntryBuilder<'_> {
        let mut entry = self.pool.acquire();
        entry
            .set_bucket_id(self.pool.bucket_id())
            .set_id(self.pool.sink().new_entry_id())
            .set_severity(severity)
            .set_message(message);

        // EMERG is 0; "at or above" means numerically at or below.
        if severity <= self.pool.stack_trace_severity() {
            let location = std::panic::Location::caller();
            entry.push_stack_frame(location.file(), location.line().min(u16::MAX as u32) as u16);
        }

        EntryBuilder::new(self, entry)
    }
}
