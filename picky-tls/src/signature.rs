//! TLS signature algorithm vocabulary

use crate::hash::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    /// RSA error
    #[error("RSA error: {context}")]
    Rsa { context: String },

    /// EC error
    #[error("EC error: {context}")]
    Ec { context: String },

    /// ED error
    #[error("ED error: {context}")]
    Ed { context: String },

    /// DSA error
    #[error("DSA error: {context}")]
    Dsa { context: String },

    /// invalid signature
    #[error("invalid signature")]
    BadSignature,

    /// unsupported algorithm
    #[error("unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// hash algorithm doesn't fit the signature algorithm
    #[error("hash algorithm {hash:?} cannot be used with {algorithm}")]
    HashMismatch {
        algorithm: SignatureAlgorithm,
        hash: HashAlgorithm,
    },

    /// digest size doesn't match its hash algorithm
    #[error("invalid digest length: expected {expected} bytes, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },
}

impl From<rsa::Error> for SignatureError {
    fn from(e: rsa::Error) -> Self {
        Self::Rsa { context: e.to_string() }
    }
}

/// TLS `SignatureAlgorithm` registry entries understood by the raw key credential.
///
/// Codes 1 to 3 are the TLS 1.2 `SignatureAlgorithm` values. Codes 4 and up are the low byte of
/// the TLS 1.3 `SignatureScheme` values carried with the `intrinsic` hash code (RFC 8422, RFC 8446).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SignatureAlgorithm {
    Rsa,
    Dsa,
    Ecdsa,
    RsaPssRsaeSha256,
    RsaPssRsaeSha384,
    RsaPssRsaeSha512,
    Ed25519,
    Ed448,
    RsaPssPssSha256,
    RsaPssPssSha384,
    RsaPssPssSha512,
}

impl SignatureAlgorithm {
    pub fn from_tls_code(code: u8) -> Option<Self> {
        let algorithm = match code {
            1 => Self::Rsa,
            2 => Self::Dsa,
            3 => Self::Ecdsa,
            4 => Self::RsaPssRsaeSha256,
            5 => Self::RsaPssRsaeSha384,
            6 => Self::RsaPssRsaeSha512,
            7 => Self::Ed25519,
            8 => Self::Ed448,
            9 => Self::RsaPssPssSha256,
            10 => Self::RsaPssPssSha384,
            11 => Self::RsaPssPssSha512,
            _ => return None,
        };

        Some(algorithm)
    }

    pub fn tls_code(self) -> u8 {
        match self {
            Self::Rsa => 1,
            Self::Dsa => 2,
            Self::Ecdsa => 3,
            Self::RsaPssRsaeSha256 => 4,
            Self::RsaPssRsaeSha384 => 5,
            Self::RsaPssRsaeSha512 => 6,
            Self::Ed25519 => 7,
            Self::Ed448 => 8,
            Self::RsaPssPssSha256 => 9,
            Self::RsaPssPssSha384 => 10,
            Self::RsaPssPssSha512 => 11,
        }
    }

    pub fn is_rsa_pss_rsae(self) -> bool {
        matches!(
            self,
            Self::RsaPssRsaeSha256 | Self::RsaPssRsaeSha384 | Self::RsaPssRsaeSha512
        )
    }

    pub fn is_rsa_pss_pss(self) -> bool {
        matches!(
            self,
            Self::RsaPssPssSha256 | Self::RsaPssPssSha384 | Self::RsaPssPssSha512
        )
    }

    /// Hash algorithm bound into a RSASSA-PSS scheme (also the MGF1 hash; salt length is its output size).
    pub fn pss_hash(self) -> Option<HashAlgorithm> {
        match self {
            Self::RsaPssRsaeSha256 | Self::RsaPssPssSha256 => Some(HashAlgorithm::SHA2_256),
            Self::RsaPssRsaeSha384 | Self::RsaPssPssSha384 => Some(HashAlgorithm::SHA2_384),
            Self::RsaPssRsaeSha512 | Self::RsaPssPssSha512 => Some(HashAlgorithm::SHA2_512),
            _ => None,
        }
    }

    /// Whether the hash is part of the scheme itself, i.e. must be paired with `HashAlgorithm::Intrinsic`.
    pub fn has_intrinsic_hash(self) -> bool {
        !matches!(self, Self::Rsa | Self::Dsa | Self::Ecdsa)
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rsa => "rsa",
            Self::Dsa => "dsa",
            Self::Ecdsa => "ecdsa",
            Self::RsaPssRsaeSha256 => "rsa_pss_rsae_sha256",
            Self::RsaPssRsaeSha384 => "rsa_pss_rsae_sha384",
            Self::RsaPssRsaeSha512 => "rsa_pss_rsae_sha512",
            Self::Ed25519 => "ed25519",
            Self::Ed448 => "ed448",
            Self::RsaPssPssSha256 => "rsa_pss_pss_sha256",
            Self::RsaPssPssSha384 => "rsa_pss_pss_sha384",
            Self::RsaPssPssSha512 => "rsa_pss_pss_sha512",
        };

        f.write_str(name)
    }
}

/// The two-byte TLS 1.2 `SignatureAndHashAlgorithm` (hash first, then signature).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureAndHashAlgorithm {
    hash: HashAlgorithm,
    signature: SignatureAlgorithm,
}

impl SignatureAndHashAlgorithm {
    pub const ED25519: Self = Self {
        hash: HashAlgorithm::Intrinsic,
        signature: SignatureAlgorithm::Ed25519,
    };
    pub const ECDSA_SHA256: Self = Self {
        hash: HashAlgorithm::SHA2_256,
        signature: SignatureAlgorithm::Ecdsa,
    };
    pub const ECDSA_SHA384: Self = Self {
        hash: HashAlgorithm::SHA2_384,
        signature: SignatureAlgorithm::Ecdsa,
    };
    pub const RSA_PKCS1_SHA256: Self = Self {
        hash: HashAlgorithm::SHA2_256,
        signature: SignatureAlgorithm::Rsa,
    };
    pub const RSA_PSS_RSAE_SHA256: Self = Self {
        hash: HashAlgorithm::Intrinsic,
        signature: SignatureAlgorithm::RsaPssRsaeSha256,
    };
    pub const RSA_PSS_PSS_SHA256: Self = Self {
        hash: HashAlgorithm::Intrinsic,
        signature: SignatureAlgorithm::RsaPssPssSha256,
    };

    /// Pairs a hash with a signature algorithm.
    ///
    /// Schemes with a built-in hash (RSASSA-PSS, EdDSA) only accept `HashAlgorithm::Intrinsic`,
    /// and the legacy `rsa`, `dsa` and `ecdsa` algorithms never accept it.
    pub fn new(hash: HashAlgorithm, signature: SignatureAlgorithm) -> Result<Self, SignatureError> {
        let intrinsic = hash == HashAlgorithm::Intrinsic;

        if intrinsic != signature.has_intrinsic_hash() {
            return Err(SignatureError::HashMismatch {
                algorithm: signature,
                hash,
            });
        }

        Ok(Self { hash, signature })
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn signature(&self) -> SignatureAlgorithm {
        self.signature
    }

    pub fn from_bytes(bytes: [u8; 2]) -> Result<Self, SignatureError> {
        let hash = HashAlgorithm::from_tls_code(bytes[0]).ok_or_else(|| SignatureError::UnsupportedAlgorithm {
            algorithm: format!("hash code {}", bytes[0]),
        })?;
        let signature =
            SignatureAlgorithm::from_tls_code(bytes[1]).ok_or_else(|| SignatureError::UnsupportedAlgorithm {
                algorithm: format!("signature code {}", bytes[1]),
            })?;

        Self::new(hash, signature)
    }

    pub fn to_bytes(self) -> [u8; 2] {
        [self.hash.tls_code(), self.signature.tls_code()]
    }
}

impl fmt::Display for SignatureAndHashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hash == HashAlgorithm::Intrinsic {
            write!(f, "{}", self.signature)
        } else {
            write!(f, "{}_{:?}", self.signature, self.hash)
        }
    }
}
