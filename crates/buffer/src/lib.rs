//! Skiff Buffer - bounded ring buffer with acknowledgement tracking
//!
//! The delivery pipeline's central data structure: a fixed number of
//! fixed-size byte slots shared between any number of producers, one writer
//! and (optionally) one acknowledgement consumer.
//!
//! Slots move through three regions, tracked by two cursors:
//!
//! ```text
//!          start                                  start + length
//!            v                                          v
//! ... [awaiting ack ....][unread ................] [free ...] ...
//!            |<-- awaiting_ack -->|<-- unread -->|
//! ```
//!
//! - a **write** appends to the unread region (or, under the replace policy,
//!   drops the oldest slot when full)
//! - a **read** hands the oldest unread slot to a callback and moves it into
//!   the awaiting-ack region
//! - an **ack** releases the oldest awaiting-ack slot
//! - a **rewind** returns every awaiting-ack slot to the unread region,
//!   preserving order, so an interrupted transfer can be replayed
//!
//! # Concurrency
//!
//! One mutex guards all state. Two [`tokio::sync::Notify`] instances play
//! the two condition-variable roles: `readable` is awaited by readers and
//! signalled by writers, `writable` is awaited by writers/drainers and
//! signalled when slots are consumed. Producer-side operations are synchronous and
//! non-blocking (except [`RingBuffer::write_or_block`]), so hot paths never
//! touch the async runtime.

mod ring;

pub use ring::RingBuffer;

use thiserror::Error;

/// Errors returned by ring buffer operations
#[derive(Debug, Error)]
pub enum RingError {
    /// Nothing to read
    #[error("buffer is empty")]
    Empty,

    /// Writing side closed and the buffer has drained
    #[error("end of buffer")]
    Eof,

    /// Buffer closed for all operations
    #[error("buffer closed")]
    Closed,

    /// Error returned by a read callback
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RingError {
    /// Whether the error signals buffer shutdown rather than a transient
    /// condition.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, RingError::Eof | RingError::Closed)
    }
}

#[cfg(test)]
mod ring_test;
