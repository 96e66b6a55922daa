//! Certificate creation

use std::net::IpAddr;

use rcgen::{
    BasicConstraints, CertificateParams, CertificateSigningRequestParams, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyIdMethod, KeyPair, KeyUsagePurpose, SanType,
    SerialNumber,
};
use rustls_pki_types::CertificateSigningRequestDer;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{AuthError, Certificate, CertificateKind, Csr, PrivateKey, Result};

/// Default certificate lifetime: ten years.
const DEFAULT_VALIDITY_DAYS: i64 = 3_650;

/// Details of the certificate to create.
#[derive(Debug, Clone)]
pub struct CertificateOptions {
    /// Subject common name. A CSR's own common name takes precedence.
    pub common_name: String,

    /// Role of the certificate, selecting key usages and CA constraints.
    pub kind: CertificateKind,

    /// Bucket ids a client certificate authorizes, carried in SubjectKeyId.
    pub bucket_ids: Vec<u32>,

    /// Expiry; ten years from now when unset.
    pub expires_at: Option<OffsetDateTime>,

    /// DNS subject alternative names.
    pub dns_names: Vec<String>,

    /// IP subject alternative names.
    pub ip_addresses: Vec<IpAddr>,
}

impl CertificateOptions {
    /// Options for a root CA certificate.
    pub fn root(common_name: &str) -> Self {
        Self::new(common_name, CertificateKind::Root)
    }

    /// Options for a client certificate.
    pub fn client(common_name: &str) -> Self {
        Self::new(common_name, CertificateKind::Client)
    }

    /// Options for a server certificate.
    pub fn server(common_name: &str) -> Self {
        Self::new(common_name, CertificateKind::Server)
    }

    fn new(common_name: &str, kind: CertificateKind) -> Self {
        Self {
            common_name: common_name.to_owned(),
            kind,
            bucket_ids: Vec::new(),
            expires_at: None,
            dns_names: Vec::new(),
            ip_addresses: Vec::new(),
        }
    }

    /// Authorize the given bucket ids.
    pub fn with_bucket_ids(mut self, bucket_ids: &[u32]) -> Self {
        self.bucket_ids = bucket_ids.to_vec();
        self
    }

    /// Add DNS subject alternative names.
    pub fn with_dns_names<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.dns_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add IP subject alternative names.
    pub fn with_ip_addresses<I: IntoIterator<Item = IpAddr>>(mut self, addrs: I) -> Self {
        self.ip_addresses.extend(addrs);
        self
    }

    /// Set an explicit expiry.
    pub fn with_expiry(mut self, expires_at: OffsetDateTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Whose public key ends up in the certificate.
#[derive(Debug, Clone, Copy)]
pub enum CertificateSubject<'a> {
    /// A locally held key; its public half is certified.
    Key(&'a PrivateKey),

    /// A PKCS#10 request from elsewhere; its embedded public key is
    /// certified and its subject/SANs are merged in.
    Request(&'a Csr),
}

/// Create and sign a certificate.
///
/// With `signer_cert` absent the result is self-signed (a root CA); the
/// `subject` then defaults to the signer key itself. A CSR subject requires
/// a signer certificate, and a CSR whose signature algorithm is not pure
/// Ed25519 is rejected with `InvalidSignatureAlgorithm`.
pub fn create_certificate(
    signer_key: &PrivateKey,
    signer_cert: Option<&Certificate>,
    options: &CertificateOptions,
    subject: Option<CertificateSubject<'_>>,
) -> Result<Certificate> {
    let signer_pair = signer_key.key_pair()?;

    let der = match subject {
        Some(CertificateSubject::Request(csr)) => {
            let Some(ca) = signer_cert else {
                return Err(AuthError::InvalidInput);
            };

            csr.validate_algorithm()?;

            let csr_der = CertificateSigningRequestDer::from(csr.der().to_vec());
            let mut csr_params = CertificateSigningRequestParams::from_der(&csr_der)
                .map_err(|_| AuthError::InvalidInput)?;

            apply_options(&mut csr_params.params, options, true)?;

            let issuer = issuer_certificate(ca, &signer_pair)?;
            csr_params
                .signed_by(&issuer, &signer_pair)?
                .der()
                .as_ref()
                .to_vec()
        }

        Some(CertificateSubject::Key(subject_key)) => {
            issue_for_key(subject_key, signer_cert, &signer_pair, options)?
        }

        None => issue_for_key(signer_key, signer_cert, &signer_pair, options)?,
    };

    Certificate::from_der(der)
}

fn issue_for_key(
    subject_key: &PrivateKey,
    signer_cert: Option<&Certificate>,
    signer_pair: &KeyPair,
    options: &CertificateOptions,
) -> Result<Vec<u8>> {
    let subject_pair = subject_key.key_pair()?;

    let mut params = CertificateParams::default();
    apply_options(&mut params, options, false)?;

    let cert = match signer_cert {
        Some(ca) => {
            let issuer = issuer_certificate(ca, signer_pair)?;
            params.signed_by(&subject_pair, &issuer, signer_pair)?
        }
        None => params.self_signed(&subject_pair)?,
    };

    Ok(cert.der().as_ref().to_vec())
}

/// Reconstruct a signing-capable issuer from an existing CA certificate.
fn issuer_certificate(ca: &Certificate, signer_pair: &KeyPair) -> Result<rcgen::Certificate> {
    let ca_der = ca.to_rustls();
    let params = CertificateParams::from_ca_cert_der(&ca_der)
        .map_err(|_| AuthError::InvalidCertificate)?;

    Ok(params.self_signed(signer_pair)?)
}

fn apply_options(
    params: &mut CertificateParams,
    options: &CertificateOptions,
    from_csr: bool,
) -> Result<()> {
    // DER integers drop leading zero bytes; the top byte must stay nonzero
    // so the serial keeps its full 16-byte width on the wire.
    let mut serial = *Uuid::new_v4().as_bytes();
    if serial[0] == 0 {
        serial[0] = 0x01;
    }
    params.serial_number = Some(SerialNumber::from_slice(&serial));

    let now = OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = options
        .expires_at
        .unwrap_or_else(|| now + Duration::days(DEFAULT_VALIDITY_DAYS));

    // A CSR's own common name wins over the options.
    let has_common_name = from_csr
        && params
            .distinguished_name
            .iter()
            .any(|(ty, _)| *ty == DnType::CommonName);

    if !has_common_name && !options.common_name.is_empty() {
        params
            .distinguished_name
            .push(DnType::CommonName, &options.common_name);
    }

    for name in &options.dns_names {
        let name = name.as_str().try_into().map_err(|_| AuthError::InvalidInput)?;
        params.subject_alt_names.push(SanType::DnsName(name));
    }

    for addr in &options.ip_addresses {
        params.subject_alt_names.push(SanType::IpAddress(*addr));
    }

    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.extended_key_usages.clear();
    params.is_ca = IsCa::NoCa;

    match options.kind {
        CertificateKind::Client => {
            params
                .extended_key_usages
                .push(ExtendedKeyUsagePurpose::ClientAuth);

            // The SubjectKeyId of a client certificate carries its
            // authorized bucket ids; empty means unrestricted.
            let mut ski = Vec::with_capacity(options.bucket_ids.len() * 4);
            for id in &options.bucket_ids {
                ski.extend_from_slice(&id.to_be_bytes());
            }
            params.key_identifier_method = KeyIdMethod::PreSpecified(ski);
        }

        CertificateKind::Server => {
            params
                .extended_key_usages
                .push(ExtendedKeyUsagePurpose::ServerAuth);
        }

        CertificateKind::Root => {
            params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
            params.key_usages.push(KeyUsagePurpose::KeyCertSign);
        }
    }

    Ok(())
}
