//! # picky-tls
//!
//! Raw public key certificates (RFC 7250) for TLS: a certificate credential wrapping a bare
//! SubjectPublicKeyInfo, and negotiation of the certificate types used by each side of a handshake.

pub mod alert;
pub mod algorithm_identifier;
pub mod certificate;
pub mod certificate_type;
pub mod config;
pub mod handshake;
pub mod hash;
pub mod key;
pub mod negotiation;
pub mod oids;
pub mod signature;
pub mod verifier;

#[cfg(test)]
mod test_utils;

pub use alert::{AlertDescription, AlertLevel, TlsFatalAlert};
pub use certificate::{ConnectionEnd, KeyExchangeAlgorithm, KeyUsage, RawKeyCertificate};
pub use certificate_type::{CertificateType, CertificateTypeList};
pub use config::CertificateTypeConfig;
pub use negotiation::{CertificateRole, CertificateTypeNegotiation, CertificateTypeNegotiator, ClientCertificate};
pub use signature::{SignatureAlgorithm, SignatureAndHashAlgorithm};
pub use verifier::Verifier;
