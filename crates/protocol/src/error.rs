//! Protocol error types

use thiserror::Error;

/// Errors that can occur when encoding, decoding or validating entries
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is too short to contain the mandatory fields
    #[error("entry too short: {actual} bytes (minimum 18)")]
    TooShort { actual: usize },

    /// Frame exceeds the maximum entry size
    #[error("entry too long: {actual} bytes (maximum 65507)")]
    TooLong { actual: usize },

    /// Frame structure does not match its declared length
    #[error("corrupt entry")]
    CorruptEntry,

    /// Severity byte outside 0..=7
    #[error("invalid severity: {0}")]
    InvalidSeverity(u8),

    /// Tag count exceeds the maximum
    #[error("too many tags: {0} (maximum 8)")]
    TooManyTags(u8),

    /// Metric count exceeds the maximum
    #[error("too many metric key/value pairs: {0} (maximum 32)")]
    TooManyMetrics(u8),

    /// Meta count exceeds the maximum
    #[error("too many meta key/value pairs: {0} (maximum 32)")]
    TooManyMeta(u8),

    /// Stack trace frame count exceeds the maximum
    #[error("too many stack trace frames: {0} (maximum 16)")]
    TooManyStackTrace(u8),
}
