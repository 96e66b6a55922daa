//! Ed25519 private keys

use std::path::Path;

use rcgen::KeyPair;
use rustls_pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};

use crate::{AuthError, PRIVATE_KEY_BLOCK, Result};

/// An Ed25519 private key, held as PKCS#8 DER.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    der: Vec<u8>,
}

impl PrivateKey {
    /// Generate a fresh Ed25519 key.
    pub fn generate() -> Result<Self> {
        let key_pair = KeyPair::generate_for(&rcgen::PKCS_ED25519)?;
        Ok(Self {
            der: key_pair.serialize_der(),
        })
    }

    /// Wrap an existing PKCS#8 DER key. The key must be Ed25519.
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let key = Self { der };
        key.key_pair()?;
        Ok(key)
    }

    /// Parse a `PRIVATE KEY` PEM block.
    pub fn from_pem(pem_data: &[u8]) -> Result<Self> {
        let block = pem::parse(pem_data)?;

        if block.tag() != PRIVATE_KEY_BLOCK {
            return Err(AuthError::InvalidBlockType);
        }

        Self::from_der(block.into_contents())
    }

    /// Read a `PRIVATE KEY` PEM file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_pem(&std::fs::read(path)?)
    }

    /// Encode as a `PRIVATE KEY` PEM block.
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(PRIVATE_KEY_BLOCK, self.der.clone()))
    }

    /// Write a `PRIVATE KEY` PEM file, readable by the owner only.
    pub fn to_pem_file(&self, path: impl AsRef<Path>) -> Result<()> {
        write_owner_only(path.as_ref(), self.to_pem().as_bytes())?;
        Ok(())
    }

    /// PKCS#8 DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Raw 32-byte Ed25519 public key.
    pub fn public_key_raw(&self) -> Result<Vec<u8>> {
        Ok(self.key_pair()?.public_key_raw().to_vec())
    }

    /// The key in the form rustls expects.
    pub fn to_rustls(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.der.clone()))
    }

    /// Signing-capable key pair, rejecting non-Ed25519 keys.
    pub(crate) fn key_pair(&self) -> Result<KeyPair> {
        let der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.der.as_slice()));
        KeyPair::from_der_and_sign_algo(&der, &rcgen::PKCS_ED25519)
            .map_err(|_| AuthError::InvalidSignatureAlgorithm)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}

#[cfg(unix)]
fn write_owner_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_owner_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}
