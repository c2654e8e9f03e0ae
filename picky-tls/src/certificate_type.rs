//! Certificate types (RFC 7250) and their extension wire format

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// `client_certificate_type` extension code point
pub const CLIENT_CERTIFICATE_TYPE_EXTENSION: u16 = 19;
/// `server_certificate_type` extension code point
pub const SERVER_CERTIFICATE_TYPE_EXTENSION: u16 = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertificateTypeError {
    /// empty certificate type list
    #[error("certificate type list is empty")]
    Empty,

    /// too many entries to fit the one byte length prefix
    #[error("certificate type list too long: {len} entries (max 255)")]
    TooLong { len: usize },

    /// duplicated entry
    #[error("duplicate certificate type: {certificate_type}")]
    Duplicate { certificate_type: CertificateType },

    /// code without a known certificate type
    #[error("unknown certificate type code: {code}")]
    UnknownCode { code: u8 },

    /// malformed extension data
    #[error("invalid certificate type extension: {context}")]
    InvalidExtensionData { context: String },
}

/// TLS certificate types supported by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CertificateType {
    /// X.509 certificate chain
    X509 = 0,
    /// Bare SubjectPublicKeyInfo (RFC 7250)
    RawPublicKey = 2,
}

impl CertificateType {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::X509),
            2 => Some(Self::RawPublicKey),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X509 => write!(f, "X.509"),
            Self::RawPublicKey => write!(f, "RawPublicKey"),
        }
    }
}

/// Ordered, non-empty and duplicate-free list of certificate types, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CertificateType>", into = "Vec<CertificateType>")]
pub struct CertificateTypeList(Vec<CertificateType>);

impl CertificateTypeList {
    pub fn new(types: Vec<CertificateType>) -> Result<Self, CertificateTypeError> {
        if types.is_empty() {
            return Err(CertificateTypeError::Empty);
        }

        if types.len() > usize::from(u8::MAX) {
            return Err(CertificateTypeError::TooLong { len: types.len() });
        }

        for (i, certificate_type) in types.iter().enumerate() {
            if types[..i].contains(certificate_type) {
                return Err(CertificateTypeError::Duplicate {
                    certificate_type: *certificate_type,
                });
            }
        }

        Ok(Self(types))
    }

    /// Configured list, an empty one standing for the implicit `{X509}` default.
    pub fn from_configured(types: Vec<CertificateType>) -> Result<Option<Self>, CertificateTypeError> {
        if types.is_empty() {
            Ok(None)
        } else {
            Self::new(types).map(Some)
        }
    }

    pub fn x509_only() -> Self {
        Self(vec![CertificateType::X509])
    }

    pub fn raw_public_key_only() -> Self {
        Self(vec![CertificateType::RawPublicKey])
    }

    /// Raw public key, falling back to X.509
    pub fn prefer_raw_public_key() -> Self {
        Self(vec![CertificateType::RawPublicKey, CertificateType::X509])
    }

    pub fn as_slice(&self) -> &[CertificateType] {
        &self.0
    }

    pub fn contains(&self, certificate_type: CertificateType) -> bool {
        self.0.contains(&certificate_type)
    }

    pub fn most_preferred(&self) -> CertificateType {
        // never empty
        self.0[0]
    }

    /// Whether the list says more than the implicit `{X509}` default.
    pub fn has_non_x509(&self) -> bool {
        self.0.iter().any(|certificate_type| *certificate_type != CertificateType::X509)
    }

    /// Offer form: `u8 length || codes`.
    pub fn encode_offer(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.0.len());
        // at most 255 entries
        bytes.push(self.0.len() as u8);
        bytes.extend(self.0.iter().map(|certificate_type| certificate_type.to_u8()));
        bytes
    }
}

impl TryFrom<Vec<CertificateType>> for CertificateTypeList {
    type Error = CertificateTypeError;

    fn try_from(types: Vec<CertificateType>) -> Result<Self, Self::Error> {
        Self::new(types)
    }
}

impl From<CertificateTypeList> for Vec<CertificateType> {
    fn from(list: CertificateTypeList) -> Self {
        list.0
    }
}

/// Decodes an offer sent by the peer.
///
/// Unknown codes are skipped, so the result may be empty even though the encoded list is not.
pub fn decode_offer(bytes: &[u8]) -> Result<Vec<CertificateType>, CertificateTypeError> {
    let (&len, codes) = bytes.split_first().ok_or_else(|| CertificateTypeError::InvalidExtensionData {
        context: "missing list length".to_owned(),
    })?;

    if len == 0 {
        return Err(CertificateTypeError::Empty);
    }

    if codes.len() != usize::from(len) {
        return Err(CertificateTypeError::InvalidExtensionData {
            context: format!("list length is {len} but {} bytes follow", codes.len()),
        });
    }

    let mut types = Vec::with_capacity(codes.len());
    for code in codes {
        match CertificateType::from_u8(*code) {
            Some(certificate_type) if !types.contains(&certificate_type) => types.push(certificate_type),
            Some(_) => {}
            None => log::debug!("ignoring unknown certificate type {code}"),
        }
    }

    Ok(types)
}

/// Selection form: a single code.
pub fn encode_selection(certificate_type: CertificateType) -> [u8; 1] {
    [certificate_type.to_u8()]
}

pub fn decode_selection(bytes: &[u8]) -> Result<CertificateType, CertificateTypeError> {
    match bytes {
        [code] => CertificateType::from_u8(*code).ok_or(CertificateTypeError::UnknownCode { code: *code }),
        _ => Err(CertificateTypeError::InvalidExtensionData {
            context: format!("selection must be a single byte, got {}", bytes.len()),
        }),
    }
}
