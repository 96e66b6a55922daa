//! Client error types

use thiserror::Error;

/// Errors reported by the client pipeline
#[derive(Debug, Error)]
pub enum ClientError {
    /// Certificate is not a client certificate
    #[error("not a client certificate")]
    NotClientCertificate,

    /// Address is not a host:port pair the TLS stack can dial
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Key or certificate material rejected
    #[error("auth error: {0}")]
    Auth(#[from] skiff_auth::AuthError),

    /// TLS configuration or handshake failure
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Socket-level failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection attempt exceeded the dial timeout
    #[error("dial timed out")]
    DialTimeout,

    /// Frame write exceeded the write timeout
    #[error("write timed out")]
    WriteTimeout,

    /// Server acknowledgement did not arrive in time
    #[error("server ack timed out")]
    AckTimeout,

    /// Client has been closed
    #[error("client closed")]
    Closed,
}
