//! Skiff Auth - mutual-TLS key and certificate material
//!
//! Everything in the Skiff transport authenticates with Ed25519 certificates
//! of a constrained shape:
//!
//! - `SignatureAlgorithm` is pure Ed25519, for keys and signatures alike
//! - the serial number is a 128-bit id (a random UUID minted at creation)
//! - a client certificate's SubjectKeyId is `4·N` bytes: N big-endian u32
//!   bucket ids the certificate is authorized to write to
//! - the root certificate is a CA with `MaxPathLen = 0` and CERT_SIGN key
//!   usage; leaf certificates carry ClientAuth or ServerAuth extended key
//!   usage
//!
//! The crate produces and parses three PEM block types: `PRIVATE KEY`
//! (PKCS#8), `CERTIFICATE` and `CERTIFICATE REQUEST` (PKCS#10).
//!
//! # Example
//!
//! ```ignore
//! use skiff_auth::{CertificateKind, CertificateOptions, PrivateKey, create_certificate};
//!
//! let root_key = PrivateKey::generate()?;
//! let root_ca = create_certificate(
//!     &root_key,
//!     None,
//!     &CertificateOptions::root("Example Root"),
//!     None,
//! )?;
//!
//! let client_key = PrivateKey::generate()?;
//! let client_cert = create_certificate(
//!     &root_key,
//!     Some(&root_ca),
//!     &CertificateOptions::client("edge-01").with_bucket_ids(&[7, 9]),
//!     Some(skiff_auth::CertificateSubject::Key(&client_key)),
//! )?;
//! ```

mod certificate;
mod create;
mod csr;
mod error;
mod key;

pub use certificate::{Certificate, CertificateKind};
pub use create::{CertificateOptions, CertificateSubject, create_certificate};
pub use csr::Csr;
pub use error::AuthError;
pub use key::PrivateKey;

/// Result type for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

pub(crate) const PRIVATE_KEY_BLOCK: &str = "PRIVATE KEY";
pub(crate) const CERTIFICATE_BLOCK: &str = "CERTIFICATE";
pub(crate) const CSR_BLOCK: &str = "CERTIFICATE REQUEST";

/// Serial numbers are 128-bit ids.
pub(crate) const SERIAL_LENGTH: usize = 16;

#[cfg(test)]
mod auth_test;
