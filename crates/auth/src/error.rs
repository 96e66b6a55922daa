//! Auth error types

use thiserror::Error;

/// Errors that can occur when creating or validating auth material
#[derive(Debug, Error)]
pub enum AuthError {
    /// Certificate missing, unparsable or mismatched with its key
    #[error("invalid certificate")]
    InvalidCertificate,

    /// Serial number absent or wider than 128 bits
    #[error("invalid serial number")]
    InvalidSerialNumber,

    /// SubjectKeyId is not a sequence of 4-byte bucket ids
    #[error("invalid subject key ID")]
    InvalidSubjectKeyId,

    /// Key or signature algorithm is not pure Ed25519
    #[error("invalid signature algorithm - must be ED25519")]
    InvalidSignatureAlgorithm,

    /// Input is not a PEM block or otherwise malformed
    #[error("invalid input")]
    InvalidInput,

    /// PEM block carries an unexpected type label
    #[error("invalid block type")]
    InvalidBlockType,

    /// Certificate or key generation failed
    #[error("certificate generation: {0}")]
    Generation(#[from] rcgen::Error),

    /// File I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<pem::PemError> for AuthError {
    fn from(_: pem::PemError) -> Self {
        AuthError::InvalidInput
    }
}
