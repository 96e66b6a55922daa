//! Borrowed log entry
//!
//! `EntryRef` is the receive-side twin of [`Entry`](crate::Entry): all string
//! fields alias the frame buffer it was parsed from, so a parse allocates
//! nothing. The view cannot outlive the buffer; a processor that needs to
//! retain an entry copies it out with [`EntryRef::to_entry`].

use crate::render::render_message;
use crate::{
    Field, Entry, EntryId, MAX_ENTRY_SIZE, MAX_META_COUNT, MAX_METRIC_COUNT,
    MAX_STACK_TRACE_COUNT, MAX_TAGS_COUNT, MIN_ENTRY_SIZE, ProtocolError,
    Result, Severity,
};

/// A decoded entry whose string fields borrow from the frame buffer.
#[derive(Debug, Clone)]
pub struct EntryRef<'a> {
    bucket_id: u32,
    id: EntryId,
    severity: Severity,
    message: &'a str,
    category_id: u8,
    tags: [&'a str; MAX_TAGS_COUNT],
    tags_count: u8,
    metric_keys: [&'a str; MAX_METRIC_COUNT],
    metric_values: [i32; MAX_METRIC_COUNT],
    metric_count: u8,
    meta_keys: [&'a str; MAX_META_COUNT],
    meta_values: [&'a str; MAX_META_COUNT],
    meta_count: u8,
    stack_trace_paths: [&'a str; MAX_STACK_TRACE_COUNT],
    stack_trace_lines: [u16; MAX_STACK_TRACE_COUNT],
    stack_trace_count: u8,
    ttl_entry: u16,
    ttl_meta: u16,
    level: Field,
}

impl<'a> EntryRef<'a> {
    /// Parse a frame without copying string data.
    ///
    /// The frame must be exactly as long as its leading length prefix claims.
    /// Walks field indices in order, consuming exactly the declared bytes;
    /// any length that would read past the end fails with `CorruptEntry`,
    /// counts above the field maxima fail with the matching `TooMany*`
    /// error, and a severity byte above 7 fails with `InvalidSeverity`.
    pub fn parse(b: &'a [u8]) -> Result<Self> {
        if b.len() < MIN_ENTRY_SIZE {
            return Err(ProtocolError::TooShort { actual: b.len() });
        }

        if b.len() > MAX_ENTRY_SIZE {
            return Err(ProtocolError::TooLong { actual: b.len() });
        }

        let total = u16::from_be_bytes([b[0], b[1]]) as usize;

        if b.len() != total {
            return Err(ProtocolError::CorruptEntry);
        }

        let mut entry = EntryRef {
            bucket_id: 0,
            id: EntryId::NIL,
            severity: Severity::Debug,
            message: "",
            category_id: 0,
            tags: [""; MAX_TAGS_COUNT],
            tags_count: 0,
            metric_keys: [""; MAX_METRIC_COUNT],
            metric_values: [0; MAX_METRIC_COUNT],
            metric_count: 0,
            meta_keys: [""; MAX_META_COUNT],
            meta_values: [""; MAX_META_COUNT],
            meta_count: 0,
            stack_trace_paths: [""; MAX_STACK_TRACE_COUNT],
            stack_trace_lines: [0; MAX_STACK_TRACE_COUNT],
            stack_trace_count: 0,
            ttl_entry: 0,
            ttl_meta: 0,
            level: Field::BucketId,
        };

        let mut s = 2usize;

        for index in 0..=Field::LAST as u8 {
            let Some(field) = Field::from_index(index) else {
                break;
            };

            match field {
                Field::BucketId => {
                    entry.bucket_id = u32::from_be_bytes([b[s], b[s + 1], b[s + 2], b[s + 3]]);
                    s += 4;
                }

                Field::EntryId => {
                    entry.id = EntryId::from_bytes(&b[s..s + 12])?;
                    s += 12;
                }

                Field::Severity => {
                    entry.severity = Severity::try_from(b[s])?;
                    s += 1;
                }

                Field::Message => {
                    let len = b[s] as usize;
                    s += 1;

                    if s + len > total {
                        return Err(ProtocolError::CorruptEntry);
                    }

                    entry.message = str_field(&b[s..s + len])?;
                    s += len;
                }

                Field::CategoryId => {
                    entry.category_id = b[s];
                    s += 1;
                }

                Field::Tags => {
                    let count = b[s];
                    s += 1;

                    if count as usize > MAX_TAGS_COUNT {
                        return Err(ProtocolError::TooManyTags(count));
                    }

                    for i in 0..count as usize {
                        if s >= total {
                            return Err(ProtocolError::CorruptEntry);
                        }

                        let len = b[s] as usize;
                        s += 1;

                        if s + len > total {
                            return Err(ProtocolError::CorruptEntry);
                        }

                        entry.tags[i] = str_field(&b[s..s + len])?;
                        s += len;
                    }

                    entry.tags_count = count;
                }

                Field::Metrics => {
                    let count = b[s];
                    s += 1;

                    if count as usize > MAX_METRIC_COUNT {
                        return Err(ProtocolError::TooManyMetrics(count));
                    }

                    for i in 0..count as usize {
                        if s >= total {
                            return Err(ProtocolError::CorruptEntry);
                        }

                        let len = b[s] as usize;
                        s += 1;

                        if s + len + 4 > total {
                            return Err(ProtocolError::CorruptEntry);
                        }

                        entry.metric_keys[i] = str_field(&b[s..s + len])?;
                        s += len;
                        entry.metric_values[i] =
                            i32::from_be_bytes([b[s], b[s + 1], b[s + 2], b[s + 3]]);
                        s += 4;
                    }

                    entry.metric_count = count;
                }

                Field::Meta => {
                    let count = b[s];
                    s += 1;

                    if count as usize > MAX_META_COUNT {
                        return Err(ProtocolError::TooManyMeta(count));
                    }

                    for i in 0..count as usize {
                        if s >= total {
                            return Err(ProtocolError::CorruptEntry);
                        }

                        let key_len = b[s] as usize;
                        s += 1;

                        if s + key_len + 2 > total {
                            return Err(ProtocolError::CorruptEntry);
                        }

                        entry.meta_keys[i] = str_field(&b[s..s + key_len])?;
                        s += key_len;

                        let val_len = u16::from_be_bytes([b[s], b[s + 1]]) as usize;
                        s += 2;

                        if s + val_len > total {
                            return Err(ProtocolError::CorruptEntry);
                        }

                        entry.meta_values[i] = str_field(&b[s..s + val_len])?;
                        s += val_len;
                    }

                    entry.meta_count = count;
                }

                Field::StackTrace => {
                    let count = b[s];
                    s += 1;

                    if count as usize > MAX_STACK_TRACE_COUNT {
                        return Err(ProtocolError::TooManyStackTrace(count));
                    }

                    for i in 0..count as usize {
                        if s >= total {
                            return Err(ProtocolError::CorruptEntry);
                        }

                        let len = b[s] as usize;
                        s += 1;

                        if s + len + 2 > total {
                            return Err(ProtocolError::CorruptEntry);
                        }

                        entry.stack_trace_paths[i] = str_field(&b[s..s + len])?;
                        s += len;
                        entry.stack_trace_lines[i] = u16::from_be_bytes([b[s], b[s + 1]]);
                        s += 2;
                    }

                    entry.stack_trace_count = count;
                }

                Field::TtlEntry | Field::TtlMeta => {
                    if s + 2 > total {
                        return Err(ProtocolError::CorruptEntry);
                    }

                    let ttl = u16::from_be_bytes([b[s], b[s + 1]]);
                    s += 2;

                    if field == Field::TtlEntry {
                        entry.ttl_entry = ttl;
                    } else {
                        entry.ttl_meta = ttl;
                    }
                }
            }

            entry.level = field;

            if s >= total {
                break;
            }

            // The next field needs at least its first byte present.
            let next_fixed = match Field::from_index(index + 1) {
                Some(Field::BucketId) => 4,
                Some(Field::EntryId) => 12,
                Some(Field::TtlEntry) | Some(Field::TtlMeta) => 2,
                Some(_) => 1,
                None => return Err(ProtocolError::CorruptEntry),
            };

            if s + next_fixed > total {
                return Err(ProtocolError::CorruptEntry);
            }
        }

        if s != total {
            return Err(ProtocolError::CorruptEntry);
        }

        Ok(entry)
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
    pub fn message(&self) -> &'a str {
        self.message
    }

    #[inline]
    pub fn category_id(&self) -> u8 {
        self.category_id
    }

    #[inline]
    pub fn tags(&self) -> &[&'a str] {
        &self.tags[..self.tags_count as usize]
    }

    pub fn metrics(&self) -> impl Iterator<Item = (&'a str, i32)> + '_ {
        let count = self.metric_count as usize;
        self.metric_keys[..count]
            .iter()
            .copied()
            .zip(self.metric_values[..count].iter().copied())
    }

    pub fn meta(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        let count = self.meta_count as usize;
        self.meta_keys[..count]
            .iter()
            .copied()
            .zip(self.meta_values[..count].iter().copied())
    }

    pub fn stack_trace(&self) -> impl Iterator<Item = (&'a str, u16)> + '_ {
        let count = self.stack_trace_count as usize;
        self.stack_trace_paths[..count]
            .iter()
            .copied()
            .zip(self.stack_trace_lines[..count].iter().copied())
    }

    #[inline]
    pub fn ttl_entry(&self) -> u16 {
        self.ttl_entry
    }

    #[inline]
    pub fn ttl_meta(&self) -> u16 {
        self.ttl_meta
    }

    /// Index of the highest field present in the frame.
    #[inline]
    pub fn level(&self) -> Field {
        self.level
    }

    /// Render the message, substituting `%s` placeholders with tags in order.
    pub fn render(&self) -> String {
        render_message(self.message, &mut self.tags().iter().copied())
    }

    /// Copy the view into an owned entry.
    pub fn to_entry(&self) -> Entry {
        let mut entry = Entry::new();
        entry.copy_from(self);
        entry
    }

    /// Borrow a view over an owned entry.
    pub(crate) fn from_entry(entry: &'a Entry) -> Self {
        let mut view = EntryRef {
            bucket_id: entry.bucket_id(),
            id: entry.id(),
            severity: entry.severity(),
            message: entry.message(),
            category_id: entry.category_id(),
            tags: [""; MAX_TAGS_COUNT],
            tags_count: 0,
            metric_keys: [""; MAX_METRIC_COUNT],
            metric_values: [0; MAX_METRIC_COUNT],
            metric_count: 0,
            meta_keys: [""; MAX_META_COUNT],
            meta_values: [""; MAX_META_COUNT],
            meta_count: 0,
            stack_trace_paths: [""; MAX_STACK_TRACE_COUNT],
            stack_trace_lines: [0; MAX_STACK_TRACE_COUNT],
            stack_trace_count: 0,
            ttl_entry: entry.ttl_entry(),
            ttl_meta: entry.ttl_meta(),
            level: entry.level(),
        };

        for (i, tag) in entry.tags().take(MAX_TAGS_COUNT).enumerate() {
            view.tags[i] = tag;
            view.tags_count = i as u8 + 1;
        }

        for (i, (key, value)) in entry.metrics().take(MAX_METRIC_COUNT).enumerate() {
            view.metric_keys[i] = key;
            view.metric_values[i] = value;
            view.metric_count = i as u8 + 1;
        }

        for (i, (key, value)) in entry.meta().take(MAX_META_COUNT).enumerate() {
            view.meta_keys[i] = key;
            view.meta_values[i] = value;
            view.meta_count = i as u8 + 1;
        }

        for (i, (path, line)) in entry.stack_trace().take(MAX_STACK_TRACE_COUNT).enumerate() {
            view.stack_trace_paths[i] = path;
            view.stack_trace_lines[i] = line;
            view.stack_trace_count = i as u8 + 1;
        }

        view
    }
}

#[inline]
fn str_field(b: &[u8]) -> Result<&str> {
    std::str::from_utf8(b).map_err(|_| ProtocolError::CorruptEntry)
}
