//! Signature verification over a parsed public key

use crate::hash::HashAlgorithm;
use crate::key::{DsaPublicKey, EcCurve, EcPublicKey, KeyMaterial};
use crate::signature::{SignatureAlgorithm, SignatureError};

use rsa::{Pkcs1v15Sign, Pss, RsaPublicKey};

/// Verifies signatures of a single algorithm with a borrowed key.
///
/// Obtained from `RawKeyCertificate::create_verifier`, which already checked that the key is
/// allowed to produce signatures of this algorithm.
#[derive(Clone, Copy, Debug)]
pub struct Verifier<'a> {
    algorithm: SignatureAlgorithm,
    key: &'a KeyMaterial,
}

impl<'a> Verifier<'a> {
    pub(crate) fn new(algorithm: SignatureAlgorithm, key: &'a KeyMaterial) -> Self {
        Self { algorithm, key }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn key(&self) -> &'a KeyMaterial {
        self.key
    }

    /// Verifies `signature` over `message`.
    ///
    /// `hash` is the hash half of the `SignatureAndHashAlgorithm`: `Intrinsic` for EdDSA and
    /// RSASSA-PSS, which use the hash bound to the algorithm.
    pub fn verify(&self, hash: HashAlgorithm, message: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        match (self.algorithm, self.key) {
            (SignatureAlgorithm::Ed25519, KeyMaterial::Ed25519(key)) => {
                self.check_hash(hash)?;
                let signature = ed25519_dalek::Signature::from_slice(signature).map_err(|e| SignatureError::Ed {
                    context: format!("invalid Ed25519 signature: {e}"),
                })?;
                key.verify_strict(message, &signature)
                    .map_err(|_| SignatureError::BadSignature)
            }
            (SignatureAlgorithm::Ed448, _) => Err(SignatureError::UnsupportedAlgorithm {
                algorithm: "Ed448".to_owned(),
            }),
            _ => {
                let hash = self.check_hash(hash)?;
                let digest = hash.digest(message).ok_or(SignatureError::HashMismatch {
                    algorithm: self.algorithm,
                    hash,
                })?;
                self.verify_digest(hash, &digest, signature)
            }
        }
    }

    /// Verifies `signature` over an already computed `digest`.
    ///
    /// EdDSA hashes the whole message itself and can't be verified this way.
    pub fn verify_digest(&self, hash: HashAlgorithm, digest: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        let hash = self.check_hash(hash)?;

        let expected = hash.output_size().ok_or(SignatureError::HashMismatch {
            algorithm: self.algorithm,
            hash,
        })?;
        if digest.len() != expected {
            return Err(SignatureError::InvalidDigestLength {
                expected,
                actual: digest.len(),
            });
        }

        match (self.algorithm, self.key) {
            (SignatureAlgorithm::Rsa, KeyMaterial::Rsa(key)) => verify_rsa_pkcs1(key, hash, digest, signature),
            (algorithm, KeyMaterial::Rsa(key)) if algorithm.pss_hash().is_some() => {
                verify_rsa_pss(key, hash, digest, signature)
            }
            (SignatureAlgorithm::Ecdsa, KeyMaterial::Ec(key)) => verify_ecdsa(key, digest, signature),
            (SignatureAlgorithm::Dsa, KeyMaterial::Dsa(key)) => verify_dsa(key, digest, signature),
            (algorithm, key) => Err(SignatureError::UnsupportedAlgorithm {
                algorithm: format!("{algorithm} over a precomputed digest with a {} key", key.family()),
            }),
        }
    }

    /// Resolves the hash actually used by the algorithm.
    fn check_hash(&self, hash: HashAlgorithm) -> Result<HashAlgorithm, SignatureError> {
        let mismatch = SignatureError::HashMismatch {
            algorithm: self.algorithm,
            hash,
        };

        match self.algorithm {
            SignatureAlgorithm::Ed25519 | SignatureAlgorithm::Ed448 => {
                if hash == HashAlgorithm::Intrinsic {
                    Ok(hash)
                } else {
                    Err(mismatch)
                }
            }
            algorithm => match algorithm.pss_hash() {
                Some(bound) if hash == HashAlgorithm::Intrinsic || hash == bound => Ok(bound),
                Some(_) => Err(mismatch),
                None if hash == HashAlgorithm::Intrinsic => Err(mismatch),
                None => Ok(hash),
            },
        }
    }
}

fn verify_rsa_pkcs1(
    key: &RsaPublicKey,
    hash: HashAlgorithm,
    digest: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let scheme = match hash {
        HashAlgorithm::SHA1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
        HashAlgorithm::SHA2_224 => Pkcs1v15Sign::new::<sha2::Sha224>(),
        HashAlgorithm::SHA2_256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashAlgorithm::SHA2_384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        HashAlgorithm::SHA2_512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        HashAlgorithm::Intrinsic => {
            return Err(SignatureError::HashMismatch {
                algorithm: SignatureAlgorithm::Rsa,
                hash,
            })
        }
    };

    key.verify(scheme, digest, signature).map_err(|e| match e {
        rsa::Error::Verification => SignatureError::BadSignature,
        other => SignatureError::from(other),
    })
}

fn verify_rsa_pss(
    key: &RsaPublicKey,
    hash: HashAlgorithm,
    digest: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    // Salt length is the hash output size.
    let scheme = match hash {
        HashAlgorithm::SHA2_256 => Pss::new::<sha2::Sha256>(),
        HashAlgorithm::SHA2_384 => Pss::new::<sha2::Sha384>(),
        HashAlgorithm::SHA2_512 => Pss::new::<sha2::Sha512>(),
        other => {
            return Err(SignatureError::UnsupportedAlgorithm {
                algorithm: format!("RSASSA-PSS with {other:?}"),
            })
        }
    };

    key.verify(scheme, digest, signature).map_err(|e| match e {
        rsa::Error::Verification => SignatureError::BadSignature,
        other => SignatureError::from(other),
    })
}

fn verify_ecdsa(key: &EcPublicKey, digest: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
    use p256::ecdsa::signature::hazmat::PrehashVerifier as _;

    match key.curve().known() {
        Some(EcCurve::NistP256) => {
            let verifying_key =
                p256::ecdsa::VerifyingKey::from_sec1_bytes(key.encoded_point()).map_err(|e| SignatureError::Ec {
                    context: format!("invalid P-256 key: {e}"),
                })?;
            let signature = p256::ecdsa::Signature::from_der(signature).map_err(|e| SignatureError::Ec {
                context: format!("invalid P-256 signature: {e}"),
            })?;
            verifying_key
                .verify_prehash(digest, &signature)
                .map_err(|_| SignatureError::BadSignature)
        }
        Some(EcCurve::NistP384) => {
            let verifying_key =
                p384::ecdsa::VerifyingKey::from_sec1_bytes(key.encoded_point()).map_err(|e| SignatureError::Ec {
                    context: format!("invalid P-384 key: {e}"),
                })?;
            let signature = p384::ecdsa::Signature::from_der(signature).map_err(|e| SignatureError::Ec {
                context: format!("invalid P-384 signature: {e}"),
            })?;
            verifying_key
                .verify_prehash(digest, &signature)
                .map_err(|_| SignatureError::BadSignature)
        }
        _ => Err(SignatureError::UnsupportedAlgorithm {
            algorithm: format!("ECDSA on {}", key.curve()),
        }),
    }
}

fn verify_dsa(key: &DsaPublicKey, digest: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
    use dsa::signature::hazmat::PrehashVerifier as _;

    let parameters = key.parameters.as_ref().ok_or_else(|| SignatureError::Dsa {
        context: "key has no domain parameters".to_owned(),
    })?;

    let components =
        dsa::Components::from_components(parameters.p.clone(), parameters.q.clone(), parameters.g.clone())
            .map_err(|_| SignatureError::Dsa {
                context: "invalid domain parameters".to_owned(),
            })?;
    // rejects y < 2 and y outside the order q subgroup
    let verifying_key = dsa::VerifyingKey::from_components(components, key.y.clone()).map_err(|_| SignatureError::Dsa {
        context: "invalid public value".to_owned(),
    })?;

    let signature = dsa::Signature::try_from(signature).map_err(|e| SignatureError::Dsa {
        context: format!("invalid signature encoding: {e}"),
    })?;

    verifying_key
        .verify_prehash(digest, &signature)
        .map_err(|_| SignatureError::BadSignature)
}
