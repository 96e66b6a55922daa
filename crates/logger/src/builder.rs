//! Fluent entry builder

use skiff_protocol::EntryId;

use crate::pool::Logger;

/// Builds one entry, field by field, and submits it with [`send`].
///
/// The logger's default tags, meta, metrics, category and TTLs are merged
/// in at send time, after the builder's own fields. Dropping the builder
/// without sending returns the entry to the pool.
///
/// [`send`]: EntryBuilder::send
pub struct EntryBuilder<'a> {
    logger: &'a Logger,
    entry: Option<skiff_protocol::Entry>,
}

impl<'a> EntryBuilder<'a> {
    pub(crate) fn new(logger: &'a Logger, entry: skiff_protocol::Entry) -> Self {
        Self {
            logger,
            entry: Some(entry),
        }
    }

    /// Append a tag, also consumed by `%s` placeholders in the message.
    pub fn tag(mut self, tag: impl std::fmt::Display) -> Self {
        if let Some(entry) = &mut self.entry {
            entry.push_tag(&tag.to_string());
        }
        self
    }

    /// Append a metric.
    pub fn metric(mut self, key: &str, value: i32) -> Self {
        if let Some(entry) = &mut self.entry {
            entry.push_metric(key, value);
        }
        self
    }

    /// Append a meta key/value pair.
    pub fn meta(mut self, key: &str, value: &str) -> Self {
        if let Some(entry) = &mut self.entry {
            entry.push_meta(key, value);
        }
        self
    }

    /// Set the category.
    pub fn category(mut self, category_id: u8) -> Self {
        if let Some(entry) = &mut self.entry {
            entry.set_category_id(category_id);
        }
        self
    }

    /// Record the calling location as a stack frame.
    #[track_caller]
    pub fn trace(mut self) -> Self {
        if let Some(entry) = &mut self.entry {
            let location = std::panic::Location::caller();
            entry.push_stack_frame(location.file(), location.line().min(u16::MAX as u32) as u16);
        }
        self
    }

    /// Append a stack frame from an external source.
    pub fn manual_trace(mut self, path: &str, line: u16) -> Self {
        if let Some(entry) = &mut self.entry {
            entry.push_stack_frame(path, line);
        }
        self
    }

    /// Override the entry TTL for this entry.
    pub fn ttl(mut self, days: u16) -> Self {
        if let Some(entry) = &mut self.entry {
            entry.set_ttl_entry(days);
        }
        self
    }

    /// Override the meta TTL for this entry.
    pub fn meta_ttl(mut self, days: u16) -> Self {
        if let Some(entry) = &mut self.entry {
            entry.set_ttl_meta(days);
        }
        self
    }

    /// Merge the logger's defaults, submit the entry and return its id.
    pub fn send(mut self) -> EntryId {
        let Some(mut entry) = self.entry.take() else {
            return EntryId::NIL;
        };

        for tag in &self.logger.tags {
            entry.push_tag(tag);
        }

        for (key, value) in &self.logger.meta {
            entry.push_meta(key, value);
        }

        for (key, value) in &self.logger.metrics {
            entry.push_metric(key, *value);
        }

        if let Some(category_id) = self.logger.category_id {
            if entry.category_id() == 0 {
                entry.set_category_id(category_id);
            }
        }

        if entry.ttl_entry() == 0 && self.logger.ttl_entry != 0 {
            entry.set_ttl_entry(self.logger.ttl_entry);
        }

        if entry.ttl_meta() == 0 && self.logger.ttl_meta != 0 {
            entry.set_ttl_meta(self.logger.ttl_meta);
        }

        let id = entry.id();
        self.logger.pool.sink().process_entry(&entry);
        self.logger.pool.release(entry);

        id
    }
}

impl Drop for EntryBuilder<'_> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.logger.pool.release(entry);
        }
    }
}
