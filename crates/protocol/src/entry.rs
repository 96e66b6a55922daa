//! Owned log entry
//!
//! `Entry` is the producer-side record: filled through typed setters, encoded
//! once, then recycled through a pool. `reset` clears counts but keeps the
//! string allocations, so a warm pool stops allocating.

use crate::render::render_message;
use crate::{
    Field, EntryId, EntryRef, LENGTH_PREFIX_SIZE, MAX_ENTRY_SIZE, MAX_KEY_SIZE,
    MAX_MESSAGE_SIZE, MAX_META_COUNT, MAX_META_VALUE_SIZE, MAX_METRIC_COUNT,
    MAX_STACK_TRACE_COUNT, MAX_STACK_TRACE_PATH_SIZE, MAX_TAG_SIZE,
    MAX_TAGS_COUNT, Result, Severity, truncate,
};

/// One log record with progressively populated fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    bucket_id: u32,
    id: EntryId,
    severity: Severity,
    message: String,
    category_id: u8,
    tags: Vec<String>,
    metric_keys: Vec<String>,
    metric_values: Vec<i32>,
    meta_keys: Vec<String>,
    meta_values: Vec<String>,
    stack_trace_paths: Vec<String>,
    stack_trace_lines: Vec<u16>,
    ttl_entry: u16,
    ttl_meta: u16,
    level: Field,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            bucket_id: 0,
            id: EntryId::NIL,
            severity: Severity::Debug,
            message: String::new(),
            category_id: 0,
            tags: Vec::new(),
            metric_keys: Vec::new(),
            metric_values: Vec::new(),
            meta_keys: Vec::new(),
            meta_values: Vec::new(),
            stack_trace_paths: Vec::new(),
            stack_trace_lines: Vec::new(),
            ttl_entry: 0,
            ttl_meta: 0,
            level: Field::Message,
        }
    }
}

impl Entry {
    /// Create an empty entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the entry as if it was fresh from the pool.
    ///
    /// Counts and lengths are cleared; string capacity is retained.
    pub fn reset(&mut self) {
        self.bucket_id = 0;
        self.id = EntryId::NIL;
        self.severity = Severity::Debug;
        self.message.clear();
        self.category_id = 0;
        self.tags.clear();
        self.metric_keys.clear();
        self.metric_values.clear();
        self.meta_keys.clear();
        self.meta_values.clear();
        self.stack_trace_paths.clear();
        self.stack_trace_lines.clear();
        self.ttl_entry = 0;
        self.ttl_meta = 0;
        self.level = Field::Message;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn bucket_id(&self) -> u32 {
        self.bucket_id
    }

    #[inline]
    pub fn id(&self) -> EntryId {
        self.id
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn category_id(&self) -> u8 {
        self.category_id
    }

    #[inline]
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn metrics(&self) -> impl Iterator<Item = (&str, i32)> {
        self.metric_keys
            .iter()
            .map(String::as_str)
            .zip(self.metric_values.iter().copied())
    }

    pub fn meta(&self) -> impl Iterator<Item = (&str, &str)> {
        self.meta_keys
            .iter()
            .map(String::as_str)
            .zip(self.meta_values.iter().map(String::as_str))
    }

    pub fn stack_trace(&self) -> impl Iterator<Item = (&str, u16)> {
        self.stack_trace_paths
            .iter()
            .map(String::as_str)
            .zip(self.stack_trace_lines.iter().copied())
    }

    #[inline]
    pub fn ttl_entry(&self) -> u16 {
        self.ttl_entry
    }

    #[inline]
    pub fn ttl_meta(&self) -> u16 {
        self.ttl_meta
    }

    /// Index of the highest populated field.
    #[inline]
    pub fn level(&self) -> Field {
        self.level
    }

    /// Render the message, substituting `%s` placeholders with tags in order.
    pub fn render(&self) -> String {
        render_message(&self.message, &mut self.tags.iter().map(String::as_str))
    }

    /// Borrow the entry as an [`EntryRef`] view.
    pub fn view(&self) -> EntryRef<'_> {
        EntryRef::from_entry(self)
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    pub fn set_bucket_id(&mut self, bucket_id: u32) -> &mut Self {
        self.bucket_id = bucket_id;
        self
    }

    pub fn set_id(&mut self, id: EntryId) -> &mut Self {
        self.id = id;
        self
    }

    pub fn set_severity(&mut self, severity: Severity) -> &mut Self {
        self.severity = severity;
        self
    }

    /// Set the message, truncated to 255 bytes.
    pub fn set_message(&mut self, message: &str) -> &mut Self {
        self.message.clear();
        self.message.push_str(truncate(message, MAX_MESSAGE_SIZE));
        self
    }

    pub fn set_category_id(&mut self, category_id: u8) -> &mut Self {
        self.inc_level(Field::CategoryId);
        self.category_id = category_id;
        self
    }

    /// Append a tag. Empty tags and tags beyond the maximum are ignored.
    pub fn push_tag(&mut self, tag: &str) -> &mut Self {
        self.inc_level(Field::Tags);

        if !tag.is_empty() && self.tags.len() < MAX_TAGS_COUNT {
            self.tags.push(truncate(tag, MAX_TAG_SIZE).to_owned());
        }

        self
    }

    /// Append a metric. Empty keys and metrics beyond the maximum are ignored.
    pub fn push_metric(&mut self, key: &str, value: i32) -> &mut Self {
        self.inc_level(Field::Metrics);

        if !key.is_empty() && self.metric_keys.len() < MAX_METRIC_COUNT {
            self.metric_keys.push(truncate(key, MAX_KEY_SIZE).to_owned());
            self.metric_values.push(value);
        }

        self
    }

    /// Append a meta key/value pair. Empty keys or values and pairs beyond
    /// the maximum are ignored.
    pub fn push_meta(&mut self, key: &str, value: &str) -> &mut Self {
        self.inc_level(Field::Meta);

        if !key.is_empty() && !value.is_empty() && self.meta_keys.len() < MAX_META_COUNT {
            self.meta_keys.push(truncate(key, MAX_KEY_SIZE).to_owned());
            self.meta_values
                .push(truncate(value, MAX_META_VALUE_SIZE).to_owned());
        }

        self
    }

    /// Append a stack trace frame. Frames beyond the maximum are ignored.
    pub fn push_stack_frame(&mut self, path: &str, line: u16) -> &mut Self {
        self.inc_level(Field::StackTrace);

        if self.stack_trace_paths.len() < MAX_STACK_TRACE_COUNT {
            self.stack_trace_paths
                .push(truncate(path, MAX_STACK_TRACE_PATH_SIZE).to_owned());
            self.stack_trace_lines.push(line);
        }

        self
    }

    pub fn set_ttl_entry(&mut self, days: u16) -> &mut Self {
        self.inc_level(Field::TtlEntry);
        self.ttl_entry = days;
        self
    }

    pub fn set_ttl_meta(&mut self, days: u16) -> &mut Self {
        self.inc_level(Field::TtlMeta);
        self.ttl_meta = days;
        self
    }

    fn inc_level(&mut self, level: Field) {
        self.level = self.level.max(level);
    }

    // ------------------------------------------------------------------
    // Codec
    // ------------------------------------------------------------------

    /// Encode the entry into `b`, which must hold at least
    /// [`MAX_ENTRY_SIZE`](crate::MAX_ENTRY_SIZE) bytes. Returns the number of
    /// bytes written, which is also stored in the frame's first two bytes.
    ///
    /// Fields `0..=level` are emitted in order. A variable-length field that
    /// would push the frame past the maximum size stops after the last item
    /// that fits, and its count byte is rewritten to the number of items
    /// actually emitted. No partial item is ever written.
    pub fn encode(&self, b: &mut [u8]) -> usize {
        let mut s = LENGTH_PREFIX_SIZE;

        for index in 0..=self.level as u8 {
            let Some(field) = Field::from_index(index) else {
                break;
            };

            match field {
                Field::BucketId => {
                    b[s..s + 4].copy_from_slice(&self.bucket_id.to_be_bytes());
                    s += 4;
                }

                Field::EntryId => {
                    b[s..s + 12].copy_from_slice(self.id.as_bytes());
                    s += 12;
                }

                Field::Severity => {
                    b[s] = self.severity as u8;
                    s += 1;
                }

                Field::Message => {
                    b[s] = self.message.len() as u8;
                    s += 1;
                    b[s..s + self.message.len()].copy_from_slice(self.message.as_bytes());
                    s += self.message.len();
                }

                Field::CategoryId => {
                    b[s] = self.category_id;
                    s += 1;
                }

                Field::Tags => {
                    let pos = s;
                    let count = self.tags.len().min(MAX_TAGS_COUNT);
                    b[s] = count as u8;
                    s += 1;

                    for (i, tag) in self.tags.iter().take(count).enumerate() {
                        if s + 1 + tag.len() > MAX_ENTRY_SIZE {
                            b[pos] = i as u8;
                            break;
                        }

                        b[s] = tag.len() as u8;
                        s += 1;
                        b[s..s + tag.len()].copy_from_slice(tag.as_bytes());
                        s += tag.len();
                    }
                }

                Field::Metrics => {
                    let pos = s;
                    let count = self.metric_keys.len().min(MAX_METRIC_COUNT);
                    b[s] = count as u8;
                    s += 1;

                    for i in 0..count {
                        let key = &self.metric_keys[i];

                        if s + 1 + key.len() + 4 > MAX_ENTRY_SIZE {
                            b[pos] = i as u8;
                            break;
                        }

                        b[s] = key.len() as u8;
                        s += 1;
                        b[s..s + key.len()].copy_from_slice(key.as_bytes());
                        s += key.len();
                        b[s..s + 4].copy_from_slice(&self.metric_values[i].to_be_bytes());
                        s += 4;
                    }
                }

                Field::Meta => {
                    let pos = s;
                    let count = self.meta_keys.len().min(MAX_META_COUNT);
                    b[s] = count as u8;
                    s += 1;

                    for i in 0..count {
                        let key = &self.meta_keys[i];
                        let value = &self.meta_values[i];

                        if s + 1 + key.len() + 2 + value.len() > MAX_ENTRY_SIZE {
                            b[pos] = i as u8;
                            break;
                        }

                        b[s] = key.len() as u8;
                        s += 1;
                        b[s..s + key.len()].copy_from_slice(key.as_bytes());
                        s += key.len();
                        b[s..s + 2].copy_from_slice(&(value.len() as u16).to_be_bytes());
                        s += 2;
                        b[s..s + value.len()].copy_from_slice(value.as_bytes());
                        s += value.len();
                    }
                }

                Field::StackTrace => {
                    if s + 1 > MAX_ENTRY_SIZE {
                        break;
                    }

                    let pos = s;
                    let count = self.stack_trace_paths.len().min(MAX_STACK_TRACE_COUNT);
                    b[s] = count as u8;
                    s += 1;

                    for i in 0..count {
                        let path = &self.stack_trace_paths[i];

                        if s + 1 + path.len() + 2 > MAX_ENTRY_SIZE {
                            b[pos] = i as u8;
                            break;
                        }

                        b[s] = path.len() as u8;
                        s += 1;
                        b[s..s + path.len()].copy_from_slice(path.as_bytes());
                        s += path.len();
                        b[s..s + 2].copy_from_slice(&self.stack_trace_lines[i].to_be_bytes());
                        s += 2;
                    }
                }

                Field::TtlEntry | Field::TtlMeta => {
                    if s + 2 > MAX_ENTRY_SIZE {
                        break;
                    }

                    let ttl = if field == Field::TtlEntry {
                        self.ttl_entry
                    } else {
                        self.ttl_meta
                    };
                    b[s..s + 2].copy_from_slice(&ttl.to_be_bytes());
                    s += 2;
                }
            }
        }

        b[..2].copy_from_slice(&(s as u16).to_be_bytes());

        s
    }

    /// Decode a frame into this entry, copying all string data.
    ///
    /// Existing allocations are reused where possible.
    pub fn decode(&mut self, b: &[u8]) -> Result<()> {
        let view = EntryRef::parse(b)?;
        self.copy_from(&view);
        Ok(())
    }

    /// Copy all fields from a borrowed view.
    pub fn copy_from(&mut self, view: &EntryRef<'_>) {
        self.reset();

        self.bucket_id = view.bucket_id();
        self.id = view.id();
        self.severity = view.severity();
        self.message.push_str(view.message());
        self.category_id = view.category_id();

        for tag in view.tags() {
            self.tags.push((*tag).to_owned());
        }

        for (key, value) in view.metrics() {
            self.metric_keys.push(key.to_owned());
            self.metric_values.push(value);
        }

        for (key, value) in view.meta() {
            self.meta_keys.push(key.to_owned());
            self.meta_values.push(value.to_owned());
        }

        for (path, line) in view.stack_trace() {
            self.stack_trace_paths.push(path.to_owned());
            self.stack_trace_lines.push(line);
        }

        self.ttl_entry = view.ttl_entry();
        self.ttl_meta = view.ttl_meta();
        self.level = view.level();
    }
}
