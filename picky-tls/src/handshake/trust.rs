//! Deciding whether a peer credential is trusted

use crate::alert::{AlertDescription, TlsFatalAlert};
use crate::certificate::RawKeyCertificate;
use crate::key::KeyError;
use der::{Decode, Encode};
use x509_cert::Certificate;

/// Trust decisions for peer credentials.
///
/// Implementations own X.509 path validation; the handshake only checks possession of the key.
pub trait PeerCertificateValidator: Send + Sync {
    /// Validates an X.509 chain (leaf first) and returns the leaf public key.
    fn validate_x509(&self, chain: &[Vec<u8>]) -> Result<RawKeyCertificate, TlsFatalAlert>;

    fn validate_raw_public_key(&self, certificate: &RawKeyCertificate) -> Result<(), TlsFatalAlert>;
}

/// Trusts exactly the pinned raw public keys and X.509 leaf certificates.
#[derive(Debug, Clone, Default)]
pub struct PinnedCertificates {
    raw_public_keys: Vec<Vec<u8>>,
    x509_leaves: Vec<Vec<u8>>,
}

impl PinnedCertificates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins an encoded SubjectPublicKeyInfo.
    pub fn with_raw_public_key(mut self, spki: impl Into<Vec<u8>>) -> Self {
        self.raw_public_keys.push(spki.into());
        self
    }

    /// Pins a DER leaf certificate.
    pub fn with_x509_certificate(mut self, certificate: impl Into<Vec<u8>>) -> Self {
        self.x509_leaves.push(certificate.into());
        self
    }
}

impl PeerCertificateValidator for PinnedCertificates {
    fn validate_x509(&self, chain: &[Vec<u8>]) -> Result<RawKeyCertificate, TlsFatalAlert> {
        let leaf = chain.first().ok_or_else(|| {
            log::warn!("empty X.509 chain");
            TlsFatalAlert::new(AlertDescription::BadCertificate)
        })?;

        if !self.x509_leaves.contains(leaf) {
            log::warn!("X.509 leaf certificate isn't pinned");
            return Err(AlertDescription::BadCertificate.into());
        }

        let spki = x509_subject_public_key_info(leaf).map_err(|e| {
            log::warn!("couldn't read the leaf public key: {e}");
            TlsFatalAlert::with_source(AlertDescription::BadCertificate, e)
        })?;

        Ok(RawKeyCertificate::new(spki))
    }

    fn validate_raw_public_key(&self, certificate: &RawKeyCertificate) -> Result<(), TlsFatalAlert> {
        if self
            .raw_public_keys
            .iter()
            .any(|pinned| pinned.as_slice() == certificate.encoded())
        {
            Ok(())
        } else {
            log::warn!("raw public key isn't pinned: {}", hex::encode(certificate.encoded()));
            Err(AlertDescription::BadCertificate.into())
        }
    }
}

/// Extracts the SubjectPublicKeyInfo of a DER certificate, without validating anything else.
pub fn x509_subject_public_key_info(certificate: &[u8]) -> Result<Vec<u8>, KeyError> {
    let certificate = Certificate::from_der(certificate).map_err(|source| KeyError::Asn1Deserialization {
        element: "certificate",
        source,
    })?;

    certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|source| KeyError::Asn1Serialization {
            element: "subject public key info",
            source,
        })
}
