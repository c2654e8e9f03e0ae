//! Public key material decoded from a DER `SubjectPublicKeyInfo`

mod ec;
mod ed;
mod ff;

use crate::oids;

use const_oid::ObjectIdentifier;
use der::asn1::{AnyRef, BitStringRef};
use der::{Decode, Encode};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use spki::{AlgorithmIdentifierRef, SubjectPublicKeyInfoRef};
use thiserror::Error;

pub use ec::{EcCurve, EcPublicKey, NamedEcCurve};
pub use ed::Ed448PublicKey;
pub use ff::{DhPublicKey, DsaParameters, DsaPublicKey};

#[cfg(test)]
pub(crate) use ff::{DhParameter, DomainParameters, DssParms};

/// Largest RSA modulus accepted from a peer, in bits
pub const RSA_MAX_MODULUS_BITS: usize = 16384;

#[derive(Debug, Error)]
pub enum KeyError {
    /// ASN1 serialization error
    #[error("(ASN1) couldn't serialize {element}: {source}")]
    Asn1Serialization {
        element: &'static str,
        source: der::Error,
    },

    /// ASN1 deserialization error
    #[error("(ASN1) couldn't deserialize {element}: {source}")]
    Asn1Deserialization {
        element: &'static str,
        source: der::Error,
    },

    /// malformed algorithm identifier
    #[error("invalid algorithm identifier: {source}")]
    Spki { source: spki::Error },

    /// RSA error
    #[error("RSA error: {context}")]
    Rsa { context: String },

    /// EC error
    #[error("EC error: {context}")]
    EC { context: String },

    /// ED error
    #[error("ED error: {context}")]
    ED { context: String },

    /// DSA error
    #[error("DSA error: {context}")]
    Dsa { context: String },

    /// DH error
    #[error("DH error: {context}")]
    Dh { context: String },

    /// unsupported algorithm
    #[error("unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },
}

impl From<rsa::Error> for KeyError {
    fn from(e: rsa::Error) -> Self {
        Self::Rsa { context: e.to_string() }
    }
}

impl From<spki::Error> for KeyError {
    fn from(e: spki::Error) -> Self {
        Self::Spki { source: e }
    }
}

impl From<der::Error> for KeyError {
    fn from(e: der::Error) -> Self {
        Self::Asn1Deserialization {
            element: "subject public key info",
            source: e,
        }
    }
}

/// Algorithm family of a public key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    Rsa,
    Dsa,
    Ec,
    Ed25519,
    Ed448,
    Dh,
}

impl std::fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Rsa => "RSA",
            Self::Dsa => "DSA",
            Self::Ec => "EC",
            Self::Ed25519 => "Ed25519",
            Self::Ed448 => "Ed448",
            Self::Dh => "DH",
        };

        f.write_str(name)
    }
}

/// Parsed public key, one variant per supported algorithm family
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyMaterial {
    Rsa(RsaPublicKey),
    Dsa(DsaPublicKey),
    Ec(EcPublicKey),
    Ed25519(ed25519_dalek::VerifyingKey),
    Ed448(Ed448PublicKey),
    Dh(DhPublicKey),
}

impl KeyMaterial {
    /// Decodes a DER `SubjectPublicKeyInfo`.
    ///
    /// RSA keys are accepted under rsaEncryption, id-RSASSA-PSS and id-ea-rsa. Diffie-Hellman keys
    /// under both the X9.42 dhpublicnumber and PKCS #3 dhKeyAgreement identifiers.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, KeyError> {
        let spki = SubjectPublicKeyInfoRef::from_der(der)?;
        let algorithm = &spki.algorithm;
        let bits = spki.subject_public_key.as_bytes().ok_or_else(|| KeyError::UnsupportedAlgorithm {
            algorithm: "subject public key with unused bits".to_owned(),
        })?;

        let key = match algorithm.oid {
            oids::RSA_ENCRYPTION | oids::RSASSA_PSS | oids::ID_EA_RSA => Self::Rsa(parse_rsa(bits)?),
            oids::DSA => Self::Dsa(ff::parse_dsa(algorithm.parameters, bits)?),
            oids::DH_PUBLIC_NUMBER => Self::Dh(ff::parse_x942_dh(algorithm.parameters, bits)?),
            oids::DH_KEY_AGREEMENT => Self::Dh(ff::parse_pkcs3_dh(algorithm.parameters, bits)?),
            oids::EC_PUBLIC_KEY => {
                let curve_oid = algorithm.parameters_oid().map_err(|e| KeyError::EC {
                    context: format!("EC key info without named curve: {e}"),
                })?;
                Self::Ec(EcPublicKey::from_encoded_point(curve_oid, bits)?)
            }
            oids::ED25519 => Self::Ed25519(ed::ed25519_from_bytes(bits)?),
            oids::ED448 => Self::Ed448(ed::ed448_from_bytes(bits)?),
            oid => {
                return Err(KeyError::UnsupportedAlgorithm {
                    algorithm: oid.to_string(),
                })
            }
        };

        Ok(key)
    }

    pub fn family(&self) -> KeyFamily {
        match self {
            Self::Rsa(_) => KeyFamily::Rsa,
            Self::Dsa(_) => KeyFamily::Dsa,
            Self::Ec(_) => KeyFamily::Ec,
            Self::Ed25519(_) => KeyFamily::Ed25519,
            Self::Ed448(_) => KeyFamily::Ed448,
            Self::Dh(_) => KeyFamily::Dh,
        }
    }

    /// Key size in bits: modulus for RSA, DSA and DH, field size for EC.
    pub fn size_bits(&self) -> Option<usize> {
        match self {
            Self::Rsa(key) => Some(key.n().bits()),
            Self::Dsa(key) => key.parameters.as_ref().map(|parameters| parameters.p.bits()),
            Self::Ec(key) => key.curve().known().map(|curve| match curve {
                EcCurve::NistP256 => 256,
                EcCurve::NistP384 => 384,
                EcCurve::NistP521 => 521,
            }),
            Self::Ed25519(_) => Some(256),
            Self::Ed448(_) => Some(456),
            Self::Dh(key) => Some(key.p.bits()),
        }
    }
}

fn parse_rsa(bits: &[u8]) -> Result<RsaPublicKey, KeyError> {
    let key = pkcs1::RsaPublicKey::from_der(bits).map_err(|e| KeyError::Asn1Deserialization {
        element: "RSA public key",
        source: e,
    })?;

    let modulus = BigUint::from_bytes_be(key.modulus.as_bytes());
    let public_exponent = BigUint::from_bytes_be(key.public_exponent.as_bytes());

    Ok(RsaPublicKey::new_with_max_size(
        modulus,
        public_exponent,
        RSA_MAX_MODULUS_BITS,
    )?)
}

/// Encodes a `SubjectPublicKeyInfo` from its parts.
pub(crate) fn encode_spki(
    oid: ObjectIdentifier,
    parameters: Option<AnyRef<'_>>,
    subject_public_key: &[u8],
) -> Result<Vec<u8>, KeyError> {
    let subject_public_key = BitStringRef::from_bytes(subject_public_key).map_err(|e| KeyError::Asn1Serialization {
        element: "subject public key",
        source: e,
    })?;

    SubjectPublicKeyInfoRef {
        algorithm: AlgorithmIdentifierRef { oid, parameters },
        subject_public_key,
    }
    .to_der()
    .map_err(|e| KeyError::Asn1Serialization {
        element: "subject public key info",
        source: e,
    })
}
