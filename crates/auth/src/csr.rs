//! PKCS#10 certificate signing requests

use std::path::Path;

use x509_parser::oid_registry::OID_SIG_ED25519;
use x509_parser::prelude::FromDer;

use crate::{AuthError, CSR_BLOCK, PrivateKey, Result};

/// A PKCS#10 certificate signing request, held as DER.
///
/// A node that should receive a client certificate generates a key and a
/// CSR locally and sends the CSR to wherever the root key lives; the private
/// key never travels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Csr {
    der: Vec<u8>,
}

impl Csr {
    /// Create a request for `key` with the given common name.
    pub fn create(key: &PrivateKey, common_name: &str) -> Result<Self> {
        let mut params = rcgen::CertificateParams::default();
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, common_name);

        let request = params.serialize_request(&key.key_pair()?)?;

        Ok(Self {
            der: request.der().as_ref().to_vec(),
        })
    }

    /// Wrap existing DER bytes, verifying they parse.
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let csr = Self { der };
        csr.parse()?;
        Ok(csr)
    }

    /// Parse a `CERTIFICATE REQUEST` PEM block.
    pub fn from_pem(pem_data: &[u8]) -> Result<Self> {
        let block = pem::parse(pem_data)?;

        if block.tag() != CSR_BLOCK {
            return Err(AuthError::InvalidBlockType);
        }

        Self::from_der(block.into_contents())
    }

    /// Read a `CERTIFICATE REQUEST` PEM file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_pem(&std::fs::read(path)?)
    }

    /// Encode as a `CERTIFICATE REQUEST` PEM block.
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(CSR_BLOCK, self.der.clone()))
    }

    /// Write a `CERTIFICATE REQUEST` PEM file.
    pub fn to_pem_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_pem())?;
        Ok(())
    }

    /// DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Common name the request asks for, when present.
    pub fn common_name(&self) -> Result<Option<String>> {
        let req = self.parse()?;
        let result = req
            .certification_request_info
            .subject
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_owned);
        Ok(result)
    }

    /// Fail unless both the key and the signature are pure Ed25519.
    pub fn validate_algorithm(&self) -> Result<()> {
        let req = self.parse()?;

        if req.signature_algorithm.algorithm != OID_SIG_ED25519
            || req
                .certification_request_info
                .subject_pki
                .algorithm
                .algorithm
                != OID_SIG_ED25519
        {
            return Err(AuthError::InvalidSignatureAlgorithm);
        }

        Ok(())
    }

    fn parse(&self) -> Result<x509_parser::certification_request::X509CertificationRequest<'_>> {
        let (_, req) =
            x509_parser::certification_request::X509CertificationRequest::from_der(&self.der)
                .map_err(|_| AuthError::InvalidInput)?;
        Ok(req)
    }
}
