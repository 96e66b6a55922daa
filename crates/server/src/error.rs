//! Server error types

use thiserror::Error;

use crate::processor::ProcessorError;

/// Errors reported by the server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Certificate is not a server certificate
    #[error("not a server certificate")]
    NotServerCertificate,

    /// Handshake completed without a peer certificate
    #[error("missing peer certificate")]
    MissingPeerCertificate,

    /// Authentication hook rejected the peer or timed out
    #[error("peer rejected by authenticator")]
    Unauthorized,

    /// Frame carries a bucket id the peer certificate does not authorize
    #[error("forbidden bucket: {0}")]
    ForbiddenBucket(u32),

    /// Client stayed silent past the client timeout
    #[error("client timed out")]
    ClientTimeout,

    /// Frame failed validation or decoding
    #[error("protocol error: {0}")]
    Protocol(#[from] skiff_protocol::ProtocolError),

    /// Key or certificate material rejected
    #[error("auth error: {0}")]
    Auth(#[from] skiff_auth::AuthError),

    /// TLS configuration or handshake failure
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Client certificate verifier could not be built
    #[error("verifier error: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),

    /// Socket-level failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry processor failure
    #[error("processor error: {0}")]
    Processor(#[source] ProcessorError),
}
