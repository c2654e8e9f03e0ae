//! Local credentials used to authenticate this side of a handshake

use crate::alert::{AlertDescription, TlsFatalAlert};
use crate::certificate::RawKeyCertificate;
use crate::certificate_type::CertificateType;
use crate::handshake::trust::x509_subject_public_key_info;
use crate::key::KeyError;
use crate::signature::SignatureAndHashAlgorithm;
use std::fmt;

/// Private key proving possession of a local credential.
#[derive(Clone)]
pub enum SigningKey {
    Ed25519(ed25519_dalek::SigningKey),
    EcdsaP256(p256::ecdsa::SigningKey),
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519(_) => write!(f, "SigningKey::Ed25519(..)"),
            Self::EcdsaP256(_) => write!(f, "SigningKey::EcdsaP256(..)"),
        }
    }
}

impl SigningKey {
    pub fn algorithm(&self) -> SignatureAndHashAlgorithm {
        match self {
            Self::Ed25519(_) => SignatureAndHashAlgorithm::ED25519,
            Self::EcdsaP256(_) => SignatureAndHashAlgorithm::ECDSA_SHA256,
        }
    }

    /// Signs `message`: raw Ed25519, or DER-encoded ECDSA over its SHA-256 digest.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Ed25519(key) => {
                use ed25519_dalek::Signer as _;
                key.sign(message).to_bytes().to_vec()
            }
            Self::EcdsaP256(key) => {
                use p256::ecdsa::signature::Signer as _;
                let signature: p256::ecdsa::Signature = key.sign(message);
                signature.to_der().as_bytes().to_vec()
            }
        }
    }

    /// Public half, as a raw public key credential.
    pub fn public_certificate(&self) -> Result<RawKeyCertificate, KeyError> {
        match self {
            Self::Ed25519(key) => RawKeyCertificate::from_ed25519(&key.verifying_key()),
            Self::EcdsaP256(key) => RawKeyCertificate::from_p256(&p256::PublicKey::from(key.verifying_key())),
        }
    }
}

/// A credential this side can present: raw public key or X.509 chain, plus its private key.
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    certificate_type: CertificateType,
    entries: Vec<Vec<u8>>,
    signing_key: SigningKey,
}

impl LocalIdentity {
    pub fn raw_public_key(signing_key: SigningKey) -> Result<Self, KeyError> {
        let certificate = signing_key.public_certificate()?;

        Ok(Self {
            certificate_type: CertificateType::RawPublicKey,
            entries: vec![certificate.encoded().to_vec()],
            signing_key,
        })
    }

    /// X.509 chain, leaf first. The leaf must hold the public half of `signing_key`.
    pub fn x509(chain: Vec<Vec<u8>>, signing_key: SigningKey) -> Result<Self, TlsFatalAlert> {
        let leaf = chain.first().ok_or_else(|| {
            log::warn!("empty certificate chain for local identity");
            TlsFatalAlert::new(AlertDescription::InternalError)
        })?;

        let leaf_key = x509_subject_public_key_info(leaf)
            .map(RawKeyCertificate::new)
            .map_err(|e| TlsFatalAlert::with_source(AlertDescription::InternalError, e))?;
        let own_key = signing_key
            .public_certificate()
            .map_err(|e| TlsFatalAlert::with_source(AlertDescription::InternalError, e))?;

        if leaf_key.public_key()? != own_key.public_key()? {
            log::warn!("leaf certificate doesn't match the signing key");
            return Err(AlertDescription::InternalError.into());
        }

        Ok(Self {
            certificate_type: CertificateType::X509,
            entries: chain,
            signing_key,
        })
    }

    pub fn certificate_type(&self) -> CertificateType {
        self.certificate_type
    }

    /// Encoded entries: one SubjectPublicKeyInfo, or the certificate chain.
    pub fn entries(&self) -> &[Vec<u8>] {
        &self.entries
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Whether the peer accepts signatures from this identity.
    pub(crate) fn is_accepted_by(&self, peer_algorithms: &[SignatureAndHashAlgorithm]) -> bool {
        peer_algorithms.contains(&self.signing_key.algorithm())
    }
}
