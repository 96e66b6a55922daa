//! Skiff Client - producer-side delivery pipeline
//!
//! Application code hands entries to [`TlsClient::process_entry`], which
//! encodes them into a bounded ring buffer and returns immediately. Two
//! background tasks move the frames to the collector:
//!
//! - the **writer** waits for unread frames, keeps a mutually-authenticated
//!   TLS 1.3 connection alive (reconnecting with capped exponential
//!   backoff), and emits one frame at a time
//! - the **ack reader** runs whenever the negotiated ALPN token selects ack
//!   mode; it consumes one status byte per emitted frame and releases the
//!   corresponding ring slot, or rewinds the ring so unacknowledged frames
//!   are replayed after a timeout or disconnect
//!
//! A persistently unreachable collector therefore degrades to the ring's
//! overwrite policy: the oldest entries drop first, and the error handler
//! hears about every failed attempt.
//!
//! # Example
//!
//! ```ignore
//! use skiff_client::{TlsClient, TlsClientOptions};
//!
//! let options = TlsClientOptions::new("logs.example.com:4610", key, cert, root_ca);
//! let client = TlsClient::start(options)?;
//!
//! let mut entry = Entry::new();
//! entry
//!     .set_id(client.new_entry_id())
//!     .set_severity(Severity::Info)
//!     .set_message("service started");
//! client.process_entry(&entry);
//! ```

mod ack;
mod backoff;
mod client;
mod conn;
mod error;
mod writer;

pub use client::{ErrorHandler, TlsClient, TlsClientOptions};
pub use error::ClientError;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Default ring buffer capacity, in entries.
pub const DEFAULT_BUFFER_SIZE: usize = 128;

/// Default timeout for one server acknowledgement byte.
pub const DEFAULT_ACK_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(3);

/// Timeout for establishing a TCP+TLS connection.
pub const DIAL_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Default timeout for writing one frame.
pub const DEFAULT_WRITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[cfg(test)]
mod backoff_test;
