//! Hash algorithms usable in a TLS `SignatureAndHashAlgorithm`

use const_oid::ObjectIdentifier;
use digest::Digest;
use serde::{Deserialize, Serialize};

use crate::oids;

/// Supported hash algorithms, with their TLS 1.2 `HashAlgorithm` code points.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum HashAlgorithm {
    SHA1,
    SHA2_224,
    SHA2_256,
    SHA2_384,
    SHA2_512,
    /// The signature scheme hashes the message itself (EdDSA, RSASSA-PSS in TLS 1.3 code points).
    Intrinsic,
}

impl HashAlgorithm {
    pub fn from_tls_code(code: u8) -> Option<Self> {
        match code {
            2 => Some(Self::SHA1),
            3 => Some(Self::SHA2_224),
            4 => Some(Self::SHA2_256),
            5 => Some(Self::SHA2_384),
            6 => Some(Self::SHA2_512),
            8 => Some(Self::Intrinsic),
            _ => None,
        }
    }

    pub fn tls_code(self) -> u8 {
        match self {
            Self::SHA1 => 2,
            Self::SHA2_224 => 3,
            Self::SHA2_256 => 4,
            Self::SHA2_384 => 5,
            Self::SHA2_512 => 6,
            Self::Intrinsic => 8,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        match *oid {
            oids::SHA1 => Some(Self::SHA1),
            oids::SHA224 => Some(Self::SHA2_224),
            oids::SHA256 => Some(Self::SHA2_256),
            oids::SHA384 => Some(Self::SHA2_384),
            oids::SHA512 => Some(Self::SHA2_512),
            _ => None,
        }
    }

    pub fn oid(self) -> Option<ObjectIdentifier> {
        match self {
            Self::SHA1 => Some(oids::SHA1),
            Self::SHA2_224 => Some(oids::SHA224),
            Self::SHA2_256 => Some(oids::SHA256),
            Self::SHA2_384 => Some(oids::SHA384),
            Self::SHA2_512 => Some(oids::SHA512),
            Self::Intrinsic => None,
        }
    }

    /// Output size in bytes. `Intrinsic` has no standalone digest.
    pub fn output_size(self) -> Option<usize> {
        match self {
            Self::SHA1 => Some(20),
            Self::SHA2_224 => Some(28),
            Self::SHA2_256 => Some(32),
            Self::SHA2_384 => Some(48),
            Self::SHA2_512 => Some(64),
            Self::Intrinsic => None,
        }
    }

    /// Hashes `msg`. `Intrinsic` returns `None`: the signature scheme consumes the message as-is.
    pub fn digest(self, msg: &[u8]) -> Option<Vec<u8>> {
        let digest = match self {
            Self::SHA1 => sha1::Sha1::digest(msg).to_vec(),
            Self::SHA2_224 => sha2::Sha224::digest(msg).to_vec(),
            Self::SHA2_256 => sha2::Sha256::digest(msg).to_vec(),
            Self::SHA2_384 => sha2::Sha384::digest(msg).to_vec(),
            Self::SHA2_512 => sha2::Sha512::digest(msg).to_vec(),
            Self::Intrinsic => return None,
        };

        Some(digest)
    }
}
