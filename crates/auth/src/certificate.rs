//! X.509 certificates

use std::path::Path;

use rustls_pki_types::CertificateDer;
use uuid::Uuid;
use x509_parser::oid_registry::OID_SIG_ED25519;
use x509_parser::prelude::{FromDer, ParsedExtension, X509Certificate};

use crate::{AuthError, CERTIFICATE_BLOCK, PrivateKey, Result, SERIAL_LENGTH};

/// Role a certificate plays in the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateKind {
    /// Leaf with ClientAuth extended key usage
    Client,
    /// Leaf with ServerAuth extended key usage
    Server,
    /// CA with CERT_SIGN key usage and MaxPathLen 0
    Root,
}

/// An X.509 certificate, held as DER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Wrap existing DER bytes, verifying they parse.
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let cert = Self { der };
        cert.x509()?;
        Ok(cert)
    }

    /// Parse a `CERTIFICATE` PEM block.
    pub fn from_pem(pem_data: &[u8]) -> Result<Self> {
        let block = pem::parse(pem_data)?;

        if block.tag() != CERTIFICATE_BLOCK {
            return Err(AuthError::InvalidBlockType);
        }

        Self::from_der(block.into_contents())
    }

    /// Read a `CERTIFICATE` PEM file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_pem(&std::fs::read(path)?)
    }

    /// Encode as a `CERTIFICATE` PEM block.
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(CERTIFICATE_BLOCK, self.der.clone()))
    }

    /// Write a `CERTIFICATE` PEM file.
    pub fn to_pem_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_pem())?;
        Ok(())
    }

    /// DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The certificate in the form rustls expects.
    pub fn to_rustls(&self) -> CertificateDer<'static> {
        CertificateDer::from(self.der.clone())
    }

    /// The 128-bit certificate id carried in the serial number.
    pub fn id(&self) -> Result<Uuid> {
        let cert = self.x509()?;
        let serial = trimmed_serial(&cert)?;

        let bytes: [u8; SERIAL_LENGTH] = serial
            .try_into()
            .map_err(|_| AuthError::InvalidSerialNumber)?;

        Ok(Uuid::from_bytes(bytes))
    }

    /// Role of the certificate, when its extensions declare one.
    pub fn kind(&self) -> Result<Option<CertificateKind>> {
        let cert = self.x509()?;
        let mut kind = None;

        for ext in cert.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::BasicConstraints(bc) if bc.ca => {
                    return Ok(Some(CertificateKind::Root));
                }
                ParsedExtension::ExtendedKeyUsage(eku) => {
                    if eku.client_auth {
                        kind = Some(CertificateKind::Client);
                    } else if eku.server_auth {
                        kind = Some(CertificateKind::Server);
                    }
                }
                _ => {}
            }
        }

        Ok(kind)
    }

    /// Raw SubjectKeyId bytes, when present.
    pub fn subject_key_id(&self) -> Result<Option<Vec<u8>>> {
        let cert = self.x509()?;

        for ext in cert.extensions() {
            if let ParsedExtension::SubjectKeyIdentifier(ki) = ext.parsed_extension() {
                return Ok(Some(ki.0.to_vec()));
            }
        }

        Ok(None)
    }

    /// Bucket ids the certificate authorizes, decoded from SubjectKeyId.
    ///
    /// An absent SubjectKeyId yields an empty list (all buckets); one whose
    /// length is not a multiple of four is invalid.
    pub fn bucket_ids(&self) -> Result<Vec<u32>> {
        let Some(ski) = self.subject_key_id()? else {
            return Ok(Vec::new());
        };

        if ski.len() % 4 != 0 {
            return Err(AuthError::InvalidSubjectKeyId);
        }

        Ok(ski
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    /// Expiry as unix seconds.
    pub fn expires_at_unix(&self) -> Result<i64> {
        Ok(self.x509()?.validity().not_after.timestamp())
    }

    /// Check the certificate's shape and that it belongs to `key`.
    ///
    /// Verifies the Ed25519 algorithms, the 128-bit serial, the SubjectKeyId
    /// length and that the embedded public key matches the private key.
    pub fn validate(&self, key: &PrivateKey) -> Result<()> {
        let cert = self.x509()?;

        if cert.signature_algorithm.algorithm != OID_SIG_ED25519
            || cert.tbs_certificate.subject_pki.algorithm.algorithm != OID_SIG_ED25519
        {
            return Err(AuthError::InvalidSignatureAlgorithm);
        }

        trimmed_serial(&cert)?;

        if cert.tbs_certificate.subject_pki.subject_public_key.data.as_ref()
            != key.public_key_raw()?.as_slice()
        {
            return Err(AuthError::InvalidCertificate);
        }

        if let Some(ski) = self.subject_key_id()? {
            if ski.len() % 4 != 0 {
                return Err(AuthError::InvalidSubjectKeyId);
            }
        }

        Ok(())
    }

    fn x509(&self) -> Result<X509Certificate<'_>> {
        let (_, cert) =
            X509Certificate::from_der(&self.der).map_err(|_| AuthError::InvalidCertificate)?;
        Ok(cert)
    }
}

/// Serial bytes with DER sign padding removed; must be exactly 128 bits.
fn trimmed_serial<'a>(cert: &'a X509Certificate<'_>) -> Result<&'a [u8]> {
    let mut raw = cert.raw_serial();

    while raw.len() > 1 && raw[0] == 0 {
        raw = &raw[1..];
    }

    if raw.len() != SERIAL_LENGTH {
        return Err(AuthError::InvalidSerialNumber);
    }

    Ok(raw)
}
