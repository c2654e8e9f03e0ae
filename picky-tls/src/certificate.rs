//! Raw public key credential (RFC 7250)

use crate::algorithm_identifier::PublicKeyAlgorithm;
use crate::alert::{AlertDescription, TlsFatalAlert};
use crate::key::{
    encode_spki, DhPublicKey, DsaPublicKey, EcCurve, EcPublicKey, Ed448PublicKey, KeyError, KeyFamily, KeyMaterial,
};
use crate::oids;
use crate::signature::SignatureAlgorithm;
use crate::verifier::Verifier;

use der::asn1::AnyRef;
use once_cell::sync::OnceCell;
use p256::elliptic_curve::sec1::ToEncodedPoint as _;
use rsa::RsaPublicKey;
use std::fmt;

/// X.509 key usages a credential may be asked about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyUsage {
    DigitalSignature,
    KeyEncipherment,
    KeyAgreement,
    KeyCertSign,
}

/// Side of the connection a credential is used on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionEnd {
    Client,
    Server,
}

/// TLS 1.2 key exchange algorithms
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum KeyExchangeAlgorithm {
    DH_DSS,
    DH_RSA,
    DHE_DSS,
    DHE_RSA,
    ECDH_ECDSA,
    ECDH_RSA,
    ECDHE_ECDSA,
    ECDHE_RSA,
    RSA,
    RSA_PSK,
    PSK,
}

/// A bare `SubjectPublicKeyInfo` used as a certificate.
///
/// The key is parsed on first use and kept afterwards. The credential has no issuer, serial number
/// nor extensions: every key usage query succeeds, and what the key may be used for is decided by
/// its algorithm family and, for RSA, by its algorithm identifier.
#[derive(Clone)]
pub struct RawKeyCertificate {
    encoded: Vec<u8>,
    algorithm: Option<PublicKeyAlgorithm>,
    key: OnceCell<KeyMaterial>,
}

impl fmt::Debug for RawKeyCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawKeyCertificate")
            .field("encoded", &hex::encode(&self.encoded))
            .field("algorithm", &self.algorithm)
            .field("parsed", &self.key.get().map(KeyMaterial::family))
            .finish()
    }
}

impl PartialEq for RawKeyCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded
    }
}

impl Eq for RawKeyCertificate {}

impl RawKeyCertificate {
    /// Wraps an encoded key info. Nothing is validated until the key is used.
    pub fn new(encoded: impl Into<Vec<u8>>) -> Self {
        let encoded = encoded.into();
        let algorithm = match PublicKeyAlgorithm::from_spki_der(&encoded) {
            Ok(algorithm) => Some(algorithm),
            Err(e) => {
                log::debug!("raw key certificate without readable algorithm identifier: {e}");
                None
            }
        };

        Self {
            encoded,
            algorithm,
            key: OnceCell::new(),
        }
    }

    pub fn from_ed25519(key: &ed25519_dalek::VerifyingKey) -> Result<Self, KeyError> {
        let encoded = encode_spki(oids::ED25519, None, key.as_bytes())?;
        Ok(Self::new(encoded))
    }

    pub fn from_p256(key: &p256::PublicKey) -> Result<Self, KeyError> {
        let point = key.to_encoded_point(false);
        let encoded = encode_spki(
            oids::EC_PUBLIC_KEY,
            Some(AnyRef::from(&oids::SECP256R1)),
            point.as_bytes(),
        )?;
        Ok(Self::new(encoded))
    }

    /// Exact bytes the credential was built from
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Algorithm identifier of the key info, `None` when the outer structure can't be decoded
    pub fn algorithm(&self) -> Option<&PublicKeyAlgorithm> {
        self.algorithm.as_ref()
    }

    /// Parsed public key.
    ///
    /// A key info that can't be parsed fails with `unsupported_certificate`, on every call.
    pub fn public_key(&self) -> Result<&KeyMaterial, TlsFatalAlert> {
        self.key
            .get_or_try_init(|| KeyMaterial::from_spki_der(&self.encoded))
            .map_err(|e| {
                log::warn!("unusable raw public key: {e}");
                TlsFatalAlert::with_source(AlertDescription::UnsupportedCertificate, e)
            })
    }

    /// Raw keys have no KeyUsage extension, so no usage is restricted.
    pub fn supports_key_usage(&self, _usage: KeyUsage) -> bool {
        true
    }

    /// TLS 1.2 signature algorithm implied by the key (RFC 5246 §7.4.6), if any.
    ///
    /// EC keys are reported as `ecdsa` whatever their curve or point format. Use
    /// [`Self::legacy_signature_algorithm_for_curves`] to restrict to negotiated curves.
    ///
    /// [`KeyMaterial`] only ever holds public keys, so the `internal_error` raised for a private
    /// key can't happen; the only failure is a key info that doesn't parse.
    pub fn legacy_signature_algorithm(&self) -> Result<Option<SignatureAlgorithm>, TlsFatalAlert> {
        let key = self.public_key()?;

        if !self.supports_key_usage(KeyUsage::DigitalSignature) {
            return Ok(None);
        }

        let algorithm = match key {
            KeyMaterial::Rsa(_) => Some(SignatureAlgorithm::Rsa),
            KeyMaterial::Dsa(_) => Some(SignatureAlgorithm::Dsa),
            KeyMaterial::Ec(_) => Some(SignatureAlgorithm::Ecdsa),
            KeyMaterial::Ed25519(_) | KeyMaterial::Ed448(_) | KeyMaterial::Dh(_) => None,
        };

        Ok(algorithm)
    }

    /// Same as [`Self::legacy_signature_algorithm`], but EC keys must lie on one of `curves`.
    pub fn legacy_signature_algorithm_for_curves(
        &self,
        curves: &[EcCurve],
    ) -> Result<Option<SignatureAlgorithm>, TlsFatalAlert> {
        if let KeyMaterial::Ec(key) = self.public_key()? {
            let on_allowed_curve = key.curve().known().map_or(false, |curve| curves.contains(&curve));
            if !on_allowed_curve {
                log::debug!("EC raw key on {} is outside the negotiated curves", key.curve());
                return Ok(None);
            }
        }

        self.legacy_signature_algorithm()
    }

    /// Whether the key may produce signatures of `algorithm`. Never fails: an unparsable key
    /// supports nothing.
    pub fn supports_signature_algorithm(&self, algorithm: SignatureAlgorithm) -> bool {
        self.signature_key(algorithm, KeyUsage::DigitalSignature).is_ok()
    }

    /// Whether the key may sign certificates with `algorithm`.
    pub fn supports_signature_algorithm_ca(&self, algorithm: SignatureAlgorithm) -> bool {
        self.signature_key(algorithm, KeyUsage::KeyCertSign).is_ok()
    }

    /// Verifier for `algorithm` signatures made by this key.
    ///
    /// Fails with `certificate_unknown` when the key family, usage or RSA parameters forbid the
    /// algorithm, and with `unsupported_certificate` when the key can't be parsed.
    pub fn create_verifier(&self, algorithm: SignatureAlgorithm) -> Result<Verifier<'_>, TlsFatalAlert> {
        let key = self.signature_key(algorithm, KeyUsage::DigitalSignature)?;
        Ok(Verifier::new(algorithm, key))
    }

    /// Commits the key to a key exchange role.
    ///
    /// Static DH and ECDH need a key agreement key of the matching family. Server side RSA key
    /// transport needs an encipherment RSA key. Everything else is rejected with
    /// `certificate_unknown`.
    pub fn use_in_role(
        &self,
        connection_end: ConnectionEnd,
        key_exchange: KeyExchangeAlgorithm,
    ) -> Result<&Self, TlsFatalAlert> {
        let key = self.public_key()?;

        let allowed = match key_exchange {
            KeyExchangeAlgorithm::DH_DSS | KeyExchangeAlgorithm::DH_RSA => {
                self.supports_key_usage(KeyUsage::KeyAgreement) && matches!(key, KeyMaterial::Dh(_))
            }
            KeyExchangeAlgorithm::ECDH_ECDSA | KeyExchangeAlgorithm::ECDH_RSA => {
                self.supports_key_usage(KeyUsage::KeyAgreement) && matches!(key, KeyMaterial::Ec(_))
            }
            KeyExchangeAlgorithm::RSA | KeyExchangeAlgorithm::RSA_PSK if connection_end == ConnectionEnd::Server => {
                self.supports_key_usage(KeyUsage::KeyEncipherment) && matches!(key, KeyMaterial::Rsa(_))
            }
            _ => false,
        };

        if allowed {
            Ok(self)
        } else {
            log::warn!(
                "{} raw key can't be used for {key_exchange:?} on the {connection_end:?} side",
                key.family()
            );
            Err(AlertDescription::CertificateUnknown.into())
        }
    }

    pub fn rsa_public_key(&self) -> Result<&RsaPublicKey, TlsFatalAlert> {
        match self.public_key()? {
            KeyMaterial::Rsa(key) => Ok(key),
            other => Err(family_mismatch(KeyFamily::Rsa, other)),
        }
    }

    pub fn dsa_public_key(&self) -> Result<&DsaPublicKey, TlsFatalAlert> {
        match self.public_key()? {
            KeyMaterial::Dsa(key) => Ok(key),
            other => Err(family_mismatch(KeyFamily::Dsa, other)),
        }
    }

    pub fn ec_public_key(&self) -> Result<&EcPublicKey, TlsFatalAlert> {
        match self.public_key()? {
            KeyMaterial::Ec(key) => Ok(key),
            other => Err(family_mismatch(KeyFamily::Ec, other)),
        }
    }

    pub fn ed25519_public_key(&self) -> Result<&ed25519_dalek::VerifyingKey, TlsFatalAlert> {
        match self.public_key()? {
            KeyMaterial::Ed25519(key) => Ok(key),
            other => Err(family_mismatch(KeyFamily::Ed25519, other)),
        }
    }

    pub fn ed448_public_key(&self) -> Result<&Ed448PublicKey, TlsFatalAlert> {
        match self.public_key()? {
            KeyMaterial::Ed448(key) => Ok(key),
            other => Err(family_mismatch(KeyFamily::Ed448, other)),
        }
    }

    pub fn dh_public_key(&self) -> Result<&DhPublicKey, TlsFatalAlert> {
        match self.public_key()? {
            KeyMaterial::Dh(key) => Ok(key),
            other => Err(family_mismatch(KeyFamily::Dh, other)),
        }
    }

    fn signature_key(&self, algorithm: SignatureAlgorithm, usage: KeyUsage) -> Result<&KeyMaterial, TlsFatalAlert> {
        let key = self.public_key()?;

        if !self.supports_key_usage(usage) {
            return Err(AlertDescription::CertificateUnknown.into());
        }

        let allowed = match (algorithm, key) {
            (
                SignatureAlgorithm::Rsa
                | SignatureAlgorithm::RsaPssRsaeSha256
                | SignatureAlgorithm::RsaPssRsaeSha384
                | SignatureAlgorithm::RsaPssRsaeSha512
                | SignatureAlgorithm::RsaPssPssSha256
                | SignatureAlgorithm::RsaPssPssSha384
                | SignatureAlgorithm::RsaPssPssSha512,
                KeyMaterial::Rsa(_),
            ) => self
                .algorithm
                .as_ref()
                .map_or(false, |identifier| identifier.allows_rsa_signature(algorithm)),
            (SignatureAlgorithm::Dsa, KeyMaterial::Dsa(_)) => true,
            (SignatureAlgorithm::Ecdsa, KeyMaterial::Ec(_)) => true,
            (SignatureAlgorithm::Ed25519, KeyMaterial::Ed25519(_)) => true,
            (SignatureAlgorithm::Ed448, KeyMaterial::Ed448(_)) => true,
            _ => false,
        };

        if allowed {
            Ok(key)
        } else {
            log::debug!("{} raw key doesn't allow {algorithm} signatures", key.family());
            Err(AlertDescription::CertificateUnknown.into())
        }
    }
}

fn family_mismatch(expected: KeyFamily, key: &KeyMaterial) -> TlsFatalAlert {
    log::warn!("expected a {expected} raw key, got {}", key.family());
    AlertDescription::CertificateUnknown.into()
}
