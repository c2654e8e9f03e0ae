//! Minimal blocking handshake exercising certificate type negotiation end to end
//!
//! Message flow:
//!
//! ```text
//! client                                   server
//! ClientHello          -------->
//!                                          ServerHello
//!                                          Certificate
//!                                          CertificateVerify
//!                                          [CertificateRequest]
//!                      <--------           ServerHelloDone
//! [Certificate]
//! [CertificateVerify]
//! Finished             -------->
//!                      <--------           Finished
//! application data     <------->           application data
//! ```
//!
//! There's no key exchange and no record protection: this drives credentials and negotiation over
//! a transport, it doesn't secure it.

mod client;
mod codec;
mod identity;
mod record;
mod server;
mod stream;
mod trust;

pub use client::{connect, ClientConfig};
pub use codec::SIGNATURE_ALGORITHMS_EXTENSION;
pub use identity::{LocalIdentity, SigningKey};
pub use server::{accept, ClientAuthMode, ServerConfig};
pub use stream::TlsStream;
pub use trust::{x509_subject_public_key_info, PeerCertificateValidator, PinnedCertificates};

use crate::alert::{AlertDescription, TlsFatalAlert};
use crate::certificate::{ConnectionEnd, RawKeyCertificate};
use crate::certificate_type::CertificateType;
use crate::signature::SignatureAndHashAlgorithm;
use codec::{CertificatePayload, CertificateVerify, Finished, HandshakeMessage, HandshakeType, TlsMessage};
use record::{decode_failure, encode_failure, RecordLayer};
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandshakeError {
    /// raised locally, the alert was sent to the peer
    #[error(transparent)]
    Fatal(#[from] TlsFatalAlert),

    /// raised by the peer
    #[error("peer sent {description}")]
    AlertReceived { description: AlertDescription },

    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

impl HandshakeError {
    /// Alert that ended the handshake, whichever side raised it.
    pub fn alert(&self) -> Option<AlertDescription> {
        match self {
            Self::Fatal(alert) => Some(alert.description()),
            Self::AlertReceived { description } => Some(*description),
            Self::Io(_) => None,
        }
    }
}

/// Credential presented by the peer, after trust validation and proof of possession.
#[derive(Debug, Clone)]
pub struct PeerCertificate {
    certificate_type: CertificateType,
    entries: Vec<Vec<u8>>,
    public_key: RawKeyCertificate,
}

impl PeerCertificate {
    pub fn certificate_type(&self) -> CertificateType {
        self.certificate_type
    }

    /// Entries as received: one SubjectPublicKeyInfo, or the X.509 chain.
    pub fn entries(&self) -> &[Vec<u8>] {
        &self.entries
    }

    /// Public key the peer proved possession of.
    pub fn public_key(&self) -> &RawKeyCertificate {
        &self.public_key
    }
}

/// Outcome of a completed handshake, from one side's point of view.
#[derive(Debug, Clone)]
pub struct HandshakeSummary {
    client_certificate_type: Option<CertificateType>,
    server_certificate_type: CertificateType,
    peer_certificate: Option<PeerCertificate>,
    peer_extensions: Vec<u16>,
}

impl HandshakeSummary {
    /// `None` when the server didn't ask for a client certificate.
    pub fn client_certificate_type(&self) -> Option<CertificateType> {
        self.client_certificate_type
    }

    pub fn server_certificate_type(&self) -> CertificateType {
        self.server_certificate_type
    }

    /// `None` for an anonymous client.
    pub fn peer_certificate(&self) -> Option<&PeerCertificate> {
        self.peer_certificate.as_ref()
    }

    /// Extension types found in the peer's hello.
    pub fn peer_extensions(&self) -> &[u16] {
        &self.peer_extensions
    }

    pub fn peer_sent_extension(&self, extension_type: u16) -> bool {
        self.peer_extensions.contains(&extension_type)
    }
}

pub fn default_signature_algorithms() -> Vec<SignatureAndHashAlgorithm> {
    vec![
        SignatureAndHashAlgorithm::ED25519,
        SignatureAndHashAlgorithm::ECDSA_SHA256,
        SignatureAndHashAlgorithm::ECDSA_SHA384,
        SignatureAndHashAlgorithm::RSA_PSS_RSAE_SHA256,
        SignatureAndHashAlgorithm::RSA_PSS_PSS_SHA256,
        SignatureAndHashAlgorithm::RSA_PKCS1_SHA256,
    ]
}

fn certificate_verify_content(signer: ConnectionEnd, transcript_hash: &[u8]) -> Vec<u8> {
    let label: &[u8] = match signer {
        ConnectionEnd::Client => b"picky-tls, client CertificateVerify",
        ConnectionEnd::Server => b"picky-tls, server CertificateVerify",
    };

    let mut content = vec![0x20; 64];
    content.extend_from_slice(label);
    content.push(0);
    content.extend_from_slice(transcript_hash);
    content
}

fn finished_verify_data(sender: ConnectionEnd, transcript_hash: &[u8]) -> [u8; 32] {
    let label: &[u8] = match sender {
        ConnectionEnd::Client => b"client finished",
        ConnectionEnd::Server => b"server finished",
    };

    let mut hasher = Sha256::new();
    hasher.update(label);
    hasher.update(transcript_hash);
    hasher.finalize().into()
}

/// Sends the Certificate message, then CertificateVerify when there is a credential.
fn send_credential<S: Read + Write>(
    record: &mut RecordLayer<S>,
    certificate_type: CertificateType,
    identity: Option<&LocalIdentity>,
    signer: ConnectionEnd,
) -> Result<(), HandshakeError> {
    let payload = match identity {
        Some(identity) => match identity.certificate_type() {
            CertificateType::RawPublicKey => CertificatePayload::RawPublicKey(identity.entries().first().cloned()),
            CertificateType::X509 => CertificatePayload::X509(identity.entries().to_vec()),
        },
        None => CertificatePayload::empty(certificate_type),
    };

    if payload.certificate_type() != certificate_type {
        log::warn!(
            "local credential is {}, negotiated {certificate_type}",
            payload.certificate_type()
        );
        return Err(TlsFatalAlert::new(AlertDescription::InternalError).into());
    }

    let message = HandshakeMessage {
        handshake_type: HandshakeType::Certificate,
        body: payload.to_body().map_err(encode_failure)?,
    };
    record.write_handshake_message(&message)?;

    let Some(identity) = identity else {
        log::debug!("{signer:?}: no {certificate_type} credential, sent an empty certificate");
        return Ok(());
    };

    let content = certificate_verify_content(signer, &record.transcript().current_hash());
    let certificate_verify = CertificateVerify {
        algorithm: identity.signing_key().algorithm(),
        signature: identity.signing_key().sign(&content),
    };
    record.write_handshake(HandshakeType::CertificateVerify, &certificate_verify)
}

/// Receives the peer Certificate message and, unless empty, checks trust and proof of possession.
fn receive_credential<S: Read + Write>(
    record: &mut RecordLayer<S>,
    certificate_type: CertificateType,
    signer: ConnectionEnd,
    validator: &dyn PeerCertificateValidator,
    accepted_algorithms: &[SignatureAndHashAlgorithm],
) -> Result<Option<PeerCertificate>, HandshakeError> {
    let body = record.expect_handshake(HandshakeType::Certificate)?;
    let payload = CertificatePayload::decode(certificate_type, &body).map_err(decode_failure)?;

    let (entries, public_key) = match payload {
        CertificatePayload::RawPublicKey(None) => return Ok(None),
        CertificatePayload::X509(chain) if chain.is_empty() => return Ok(None),
        CertificatePayload::RawPublicKey(Some(spki)) => {
            let certificate = RawKeyCertificate::new(spki.clone());
            validator.validate_raw_public_key(&certificate)?;
            (vec![spki], certificate)
        }
        CertificatePayload::X509(chain) => {
            let leaf_key = validator.validate_x509(&chain)?;
            (chain, leaf_key)
        }
    };

    let content = certificate_verify_content(signer, &record.transcript().current_hash());
    let body = record.expect_handshake(HandshakeType::CertificateVerify)?;
    let certificate_verify = CertificateVerify::from_body(&body).map_err(decode_failure)?;
    let algorithm = certificate_verify.algorithm;

    if !accepted_algorithms.contains(&algorithm) {
        log::warn!("{signer:?} signed with {algorithm}, which wasn't offered");
        return Err(TlsFatalAlert::new(AlertDescription::IllegalParameter).into());
    }

    public_key
        .create_verifier(algorithm.signature())?
        .verify(algorithm.hash(), &content, &certificate_verify.signature)
        .map_err(|e| {
            log::warn!("{signer:?} CertificateVerify doesn't verify: {e}");
            TlsFatalAlert::with_source(AlertDescription::DecryptError, e)
        })?;

    log::debug!("{signer:?} proved possession of its {certificate_type} credential");

    Ok(Some(PeerCertificate {
        certificate_type,
        entries,
        public_key,
    }))
}

fn send_finished<S: Read + Write>(record: &mut RecordLayer<S>, sender: ConnectionEnd) -> Result<(), HandshakeError> {
    let finished = Finished {
        verify_data: finished_verify_data(sender, &record.transcript().current_hash()),
    };
    record.write_handshake(HandshakeType::Finished, &finished)
}

fn receive_finished<S: Read + Write>(record: &mut RecordLayer<S>, sender: ConnectionEnd) -> Result<(), HandshakeError> {
    let expected = finished_verify_data(sender, &record.transcript().current_hash());
    let body = record.expect_handshake(HandshakeType::Finished)?;
    let finished = Finished::from_body(&body).map_err(decode_failure)?;

    if finished.verify_data != expected {
        log::warn!("{sender:?} Finished doesn't match the transcript");
        return Err(TlsFatalAlert::new(AlertDescription::DecryptError).into());
    }

    Ok(())
}
