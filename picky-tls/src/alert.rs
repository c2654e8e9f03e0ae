//! TLS alert vocabulary and the fatal alert error type

use std::error::Error as StdError;
use std::fmt;

/// Alert level as found on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

impl AlertLevel {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Warning),
            2 => Some(Self::Fatal),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Alert descriptions (RFC 5246 §7.2, RFC 8446 §6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlertDescription {
    CloseNotify = 0,
    UnexpectedMessage = 10,
    HandshakeFailure = 40,
    BadCertificate = 42,
    UnsupportedCertificate = 43,
    CertificateUnknown = 46,
    IllegalParameter = 47,
    DecodeError = 50,
    DecryptError = 51,
    InternalError = 80,
    UnsupportedExtension = 110,
}

impl AlertDescription {
    pub fn from_u8(value: u8) -> Option<Self> {
        let description = match value {
            0 => Self::CloseNotify,
            10 => Self::UnexpectedMessage,
            40 => Self::HandshakeFailure,
            42 => Self::BadCertificate,
            43 => Self::UnsupportedCertificate,
            46 => Self::CertificateUnknown,
            47 => Self::IllegalParameter,
            50 => Self::DecodeError,
            51 => Self::DecryptError,
            80 => Self::InternalError,
            110 => Self::UnsupportedExtension,
            _ => return None,
        };

        Some(description)
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for AlertDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CloseNotify => "close_notify",
            Self::UnexpectedMessage => "unexpected_message",
            Self::HandshakeFailure => "handshake_failure",
            Self::BadCertificate => "bad_certificate",
            Self::UnsupportedCertificate => "unsupported_certificate",
            Self::CertificateUnknown => "certificate_unknown",
            Self::IllegalParameter => "illegal_parameter",
            Self::DecodeError => "decode_error",
            Self::DecryptError => "decrypt_error",
            Self::InternalError => "internal_error",
            Self::UnsupportedExtension => "unsupported_extension",
        };

        write!(f, "{name}({})", self.to_u8())
    }
}

/// A fatal, connection-terminating condition.
///
/// Raising side: the handshake sends the alert to the peer and stops. There is no recovery and no
/// retry within the same handshake.
#[derive(Debug, thiserror::Error)]
#[error("fatal alert: {description}")]
pub struct TlsFatalAlert {
    description: AlertDescription,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl TlsFatalAlert {
    pub fn new(description: AlertDescription) -> Self {
        Self {
            description,
            source: None,
        }
    }

    pub fn with_source<E>(description: AlertDescription, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self {
            description,
            source: Some(source.into()),
        }
    }

    pub fn description(&self) -> AlertDescription {
        self.description
    }
}

impl From<AlertDescription> for TlsFatalAlert {
    fn from(description: AlertDescription) -> Self {
        Self::new(description)
    }
}
