//! Skiff Server - collector-side TLS endpoint
//!
//! Accepts mutually-authenticated TLS 1.3 connections from Skiff clients,
//! reads length-prefixed entry frames, validates and decodes them, and hands
//! each entry to a pluggable [`EntryProcessor`].
//!
//! # Authorization
//!
//! Client certificates must match the Skiff shape: Ed25519, a 128-bit
//! serial number and a SubjectKeyId made of big-endian u32 bucket ids. The
//! shape is enforced inside the TLS handshake; after it, each frame's bucket
//! id is checked against the certificate's set (an empty set authorizes all
//! buckets) and an optional [`Authenticator`] hook can reject the peer
//! outright.
//!
//! # Backpressure
//!
//! The processor runs synchronously inside the connection task, so a slow
//! processor slows down exactly the connection that feeds it. Concurrency
//! comes from accepting many connections.
//!
//! # Example
//!
//! ```ignore
//! use skiff_server::{TlsServer, TlsServerOptions};
//!
//! let options = TlsServerOptions::new("0.0.0.0:4610", key, cert, root_ca, processor);
//! let server = TlsServer::bind(options).await?;
//! server.run(cancel).await?;
//! ```

mod connection;
mod error;
mod processor;
mod server;
mod verifier;

pub use error::ServerError;
pub use processor::{EchoProcessor, EntryProcessor, ProcessorError};
pub use server::{Authenticator, TlsServer, TlsServerOptions};

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Default per-read client timeout.
pub const DEFAULT_CLIENT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// Timeout for the optional authentication hook.
pub const AUTH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);
