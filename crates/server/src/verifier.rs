//! Client certificate verification
//!
//! Chain validation is delegated to rustls's webpki verifier; on top of it
//! the Skiff shape rules are enforced while the handshake is still in
//! flight, so a malformed certificate never reaches the read loop.

use std::sync::Arc;

use rustls::DistinguishedName;
use rustls::RootCertStore;
use rustls::server::WebPkiClientVerifier;
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls_pki_types::{CertificateDer, UnixTime};
use skiff_auth::Certificate;

use crate::Result;

/// Webpki verification plus the Skiff certificate-shape rules.
#[derive(Debug)]
pub(crate) struct ShapeVerifier {
    inner: Arc<dyn ClientCertVerifier>,
}

impl ShapeVerifier {
    pub(crate) fn new(root_ca: &Certificate) -> Result<Arc<Self>> {
        let mut roots = RootCertStore::empty();
        roots.add(root_ca.to_rustls())?;

        let inner = WebPkiClientVerifier::builder(Arc::new(roots)).build()?;

        Ok(Arc::new(Self { inner }))
    }
}

/// Serial must be a 128-bit id and SubjectKeyId a sequence of u32 bucket
/// ids.
fn verify_shape(end_entity: &CertificateDer<'_>) -> std::result::Result<(), rustls::Error> {
    let cert = Certificate::from_der(end_entity.as_ref().to_vec())
        .map_err(|err| rustls::Error::General(err.to_string()))?;

    cert.id()
        .map_err(|err| rustls::Error::General(err.to_string()))?;
    cert.bucket_ids()
        .map_err(|err| rustls::Error::General(err.to_string()))?;

    Ok(())
}

impl ClientCertVerifier for ShapeVerifier {
    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        self.inner.root_hint_subjects()
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> std::result::Result<ClientCertVerified, rustls::Error> {
        let verified = self
            .inner
            .verify_client_cert(end_entity, intermediates, now)?;

        verify_shape(end_entity)?;

        Ok(verified)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
