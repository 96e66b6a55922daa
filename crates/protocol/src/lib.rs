//! Skiff Protocol - wire format and core types for the Skiff log shipper
//!
//! This crate provides the types that flow through the pipeline:
//! - `Entry` - an owned log record, filled by producers and pooled for reuse
//! - `EntryRef` - a borrowed view decoded straight from a receive buffer
//! - `EntryId` - 96-bit sortable, timestamped identifier
//! - `Severity` - syslog-style severity (EMERG..DEBUG)
//!
//! # Wire Format
//!
//! Every frame starts with a 2-byte big-endian total length (inclusive of
//! itself), followed by fields in a fixed order. Fields are populated
//! progressively: an entry carries a `level`, the index of the highest
//! populated field, and the encoder emits fields `0..=level` only.
//!
//! ```text
//! [2 bytes: total length (big-endian)]
//! [4 bytes: bucket id]
//! [12 bytes: entry id]
//! [1 byte: severity]
//! [1 byte: message length][message]
//! [1 byte: category id]
//! [1 byte: tag count][tags...]
//! [1 byte: metric count][metrics...]
//! [1 byte: meta count][meta...]
//! [1 byte: stack trace count][frames...]
//! [2 bytes: entry TTL days]
//! [2 bytes: meta TTL days]
//! ```
//!
//! # Design
//!
//! - **Bounded everything**: every variable-length field has a hard maximum,
//!   and the whole frame fits in a single UDP datagram (65,507 bytes) even
//!   though transport is TCP/TLS.
//! - **Zero-copy reads**: `EntryRef::parse` borrows string fields from the
//!   input buffer; nothing is allocated on the receive path.
//! - **Pool-friendly writes**: `Entry::reset` clears counts but keeps string
//!   capacity, so pooled entries stop allocating once warm.

mod entry;
mod entry_id;
mod entry_ref;
mod error;
mod render;
mod severity;
pub mod transport;
mod validate;

pub use entry::Entry;
pub use entry_id::EntryId;
pub use entry_ref::EntryRef;
pub use error::ProtocolError;
pub use severity::Severity;
pub use validate::validate_frame;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Maximum size of an encoded entry (fits a single UDP datagram)
pub const MAX_ENTRY_SIZE: usize = 65_507;

/// Minimum size of an encoded entry: length prefix + bucket id + entry id
pub const MIN_ENTRY_SIZE: usize = 18;

/// Length prefix size (2 bytes, big-endian u16)
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Entry id length in bytes
pub const ENTRY_ID_LENGTH: usize = 12;

/// Maximum message length in bytes
pub const MAX_MESSAGE_SIZE: usize = u8::MAX as usize;

/// Maximum tag length in bytes
pub const MAX_TAG_SIZE: usize = u8::MAX as usize;

/// Maximum metric/meta key length in bytes
pub const MAX_KEY_SIZE: usize = u8::MAX as usize;

/// Maximum meta value length in bytes
pub const MAX_META_VALUE_SIZE: usize = u16::MAX as usize;

/// Maximum stack trace path length in bytes
pub const MAX_STACK_TRACE_PATH_SIZE: usize = u8::MAX as usize;

/// Maximum number of tags per entry
pub const MAX_TAGS_COUNT: usize = 8;

/// Maximum number of metric key/value pairs per entry
pub const MAX_METRIC_COUNT: usize = 32;

/// Maximum number of meta key/value pairs per entry
pub const MAX_META_COUNT: usize = 32;

/// Maximum number of stack trace frames per entry
pub const MAX_STACK_TRACE_COUNT: usize = 16;

/// Field indices of the wire format, in emission order.
///
/// An entry's `level` is the highest populated index; the encoder stops
/// after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Field {
    BucketId = 0,
    EntryId = 1,
    Severity = 2,
    Message = 3,
    CategoryId = 4,
    Tags = 5,
    Metrics = 6,
    Meta = 7,
    StackTrace = 8,
    TtlEntry = 9,
    TtlMeta = 10,
}

impl Field {
    /// The last field of the wire format.
    pub const LAST: Field = Field::TtlMeta;

    pub(crate) fn from_index(index: u8) -> Option<Field> {
        Some(match index {
            0 => Field::BucketId,
            1 => Field::EntryId,
            2 => Field::Severity,
            3 => Field::Message,
            4 => Field::CategoryId,
            5 => Field::Tags,
            6 => Field::Metrics,
            7 => Field::Meta,
            8 => Field::StackTrace,
            9 => Field::TtlEntry,
            10 => Field::TtlMeta,
            _ => return None,
        })
    }
}

/// Truncate a string to at most `max` bytes without splitting a character.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }

    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

#[cfg(test)]
mod entry_test;
#[cfg(test)]
mod render_test;
