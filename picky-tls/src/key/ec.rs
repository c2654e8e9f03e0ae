use crate::key::KeyError;
use crate::oids;

use const_oid::ObjectIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Elliptic curve name to use for curve operations which require curve-specific arithmetic.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum EcCurve {
    /// NIST P-256 curve (secp256r1)
    NistP256,
    /// NIST P-384 curve (secp384r1)
    NistP384,
    /// NIST P-521 curve (secp521r1)
    NistP521,
}

impl EcCurve {
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            EcCurve::NistP256 => oids::SECP256R1,
            EcCurve::NistP384 => oids::SECP384R1,
            EcCurve::NistP521 => oids::SECP521R1,
        }
    }

    /// Get size of field component in bytes (e.g. X and Y point values)
    pub(crate) fn field_bytes_size(self) -> usize {
        match self {
            EcCurve::NistP256 => 32,
            EcCurve::NistP384 => 48,
            EcCurve::NistP521 => 66,
        }
    }
}

impl Display for EcCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NistP256 => write!(f, "NIST-P256"),
            Self::NistP384 => write!(f, "NIST-P384"),
            Self::NistP521 => write!(f, "NIST-P521"),
        }
    }
}

/// Curve named by the `ECParameters` of a key
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NamedEcCurve {
    Known(EcCurve),
    Unsupported(ObjectIdentifier),
}

impl NamedEcCurve {
    pub fn known(&self) -> Option<EcCurve> {
        match self {
            Self::Known(curve) => Some(*curve),
            Self::Unsupported(_) => None,
        }
    }
}

impl Display for NamedEcCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(curve) => curve.fmt(f),
            Self::Unsupported(oid) => write!(f, "Unsupported(OID: {oid})"),
        }
    }
}

impl From<ObjectIdentifier> for NamedEcCurve {
    fn from(value: ObjectIdentifier) -> Self {
        match value {
            oids::SECP256R1 => NamedEcCurve::Known(EcCurve::NistP256),
            oids::SECP384R1 => NamedEcCurve::Known(EcCurve::NistP384),
            oids::SECP521R1 => NamedEcCurve::Known(EcCurve::NistP521),
            _ => NamedEcCurve::Unsupported(value),
        }
    }
}

impl From<NamedEcCurve> for ObjectIdentifier {
    fn from(value: NamedEcCurve) -> Self {
        match value {
            NamedEcCurve::Known(curve) => curve.oid(),
            NamedEcCurve::Unsupported(oid) => oid,
        }
    }
}

/// Elliptic curve public key: named curve and SEC1 encoded point.
///
/// Points on known curves are checked to be on the curve when parsed. Points on other curves are
/// kept as-is: they can still be reported as `ecdsa` keys but can't verify anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcPublicKey {
    curve: NamedEcCurve,
    point: Vec<u8>,
}

impl EcPublicKey {
    pub(crate) fn from_encoded_point(curve_oid: ObjectIdentifier, point: &[u8]) -> Result<Self, KeyError> {
        let curve = NamedEcCurve::from(curve_oid);

        match curve {
            NamedEcCurve::Known(EcCurve::NistP256) => {
                p256::PublicKey::from_sec1_bytes(point).map_err(|_| KeyError::EC {
                    context: "invalid P-256 public key point".to_owned(),
                })?;
            }
            NamedEcCurve::Known(EcCurve::NistP384) => {
                p384::PublicKey::from_sec1_bytes(point).map_err(|_| KeyError::EC {
                    context: "invalid P-384 public key point".to_owned(),
                })?;
            }
            NamedEcCurve::Known(EcCurve::NistP521) => {
                p521::PublicKey::from_sec1_bytes(point).map_err(|_| KeyError::EC {
                    context: "invalid P-521 public key point".to_owned(),
                })?;
            }
            NamedEcCurve::Unsupported(_) => {
                if !matches!(point.first(), Some(0x02..=0x04)) {
                    return Err(KeyError::EC {
                        context: format!("public key point on curve {curve} is not SEC1 encoded"),
                    });
                }
            }
        }

        Ok(Self {
            curve,
            point: point.to_vec(),
        })
    }

    pub fn curve(&self) -> &NamedEcCurve {
        &self.curve
    }

    /// SEC1 encoded point, as found in the key info
    pub fn encoded_point(&self) -> &[u8] {
        &self.point
    }

    /// Point size check against the curve, `None` for unsupported curves.
    pub fn is_uncompressed(&self) -> Option<bool> {
        let curve = self.curve.known()?;
        Some(self.point.len() == 1 + 2 * curve.field_bytes_size() && self.point[0] == 0x04)
    }
}
