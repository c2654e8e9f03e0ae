//! Server side of the handshake

use super::codec::{
    decode_signature_algorithms, find_extension, CertificateRequest, Extension, HandshakeType, Hello, ServerHelloDone,
    TlsMessage, RANDOM_LEN, SIGNATURE_ALGORITHMS_EXTENSION,
};
use super::record::{decode_failure, RecordLayer};
use super::{
    default_signature_algorithms, receive_credential, receive_finished, send_credential, send_finished,
    HandshakeError, HandshakeSummary, LocalIdentity, PeerCertificateValidator, TlsStream,
};
use crate::alert::{AlertDescription, TlsFatalAlert};
use crate::certificate::ConnectionEnd;
use crate::certificate_type::{CLIENT_CERTIFICATE_TYPE_EXTENSION, SERVER_CERTIFICATE_TYPE_EXTENSION};
use crate::config::CertificateTypeConfig;
use crate::negotiation::{CertificateRole, CertificateTypeNegotiator};
use crate::signature::SignatureAndHashAlgorithm;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::sync::Arc;

/// Whether the server asks the client for a certificate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMode {
    /// No CertificateRequest; a client certificate type offer is ignored
    #[default]
    Disabled,
    /// Anonymous clients are accepted
    Optional,
    /// An empty client certificate is a `handshake_failure`
    Required,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub certificate_types: CertificateTypeConfig,
    /// Credentials for the server certificate, one of each type that may be negotiated
    pub identities: Vec<LocalIdentity>,
    pub client_auth: ClientAuthMode,
    pub validator: Arc<dyn PeerCertificateValidator>,
    /// Accepted for the client CertificateVerify, and sent in CertificateRequest
    pub signature_algorithms: Vec<SignatureAndHashAlgorithm>,
}

impl ServerConfig {
    pub fn new(identities: Vec<LocalIdentity>, validator: Arc<dyn PeerCertificateValidator>) -> Self {
        Self {
            certificate_types: CertificateTypeConfig::default(),
            identities,
            client_auth: ClientAuthMode::Disabled,
            validator,
            signature_algorithms: default_signature_algorithms(),
        }
    }
}

/// Runs the server handshake over `stream`.
///
/// A locally raised fatal alert is sent to the client before returning.
pub fn accept<S, R>(config: &ServerConfig, stream: S, rng: &mut R) -> Result<TlsStream<S>, HandshakeError>
where
    S: Read + Write,
    R: RngCore + CryptoRng,
{
    let mut record = RecordLayer::new(stream);

    match handshake(config, &mut record, rng) {
        Ok(summary) => Ok(TlsStream::new(record, summary)),
        Err(e) => Err(record.abort(e)),
    }
}

fn handshake<S, R>(
    config: &ServerConfig,
    record: &mut RecordLayer<S>,
    rng: &mut R,
) -> Result<HandshakeSummary, HandshakeError>
where
    S: Read + Write,
    R: RngCore + CryptoRng,
{
    let mut negotiator = CertificateTypeNegotiator::new(&config.certificate_types);

    let body = record.expect_handshake(HandshakeType::ClientHello)?;
    let client_hello = Hello::from_body(&body).map_err(decode_failure)?;
    let extensions = &client_hello.extensions;

    let peer_algorithms = match find_extension(extensions, SIGNATURE_ALGORITHMS_EXTENSION) {
        Some(data) => decode_signature_algorithms(data).map_err(decode_failure)?,
        None => default_signature_algorithms(),
    };

    let server_type = negotiator
        .role_mut(CertificateRole::Server)
        .select_from_extension(find_extension(extensions, SERVER_CERTIFICATE_TYPE_EXTENSION))?;

    let client_type = match config.client_auth {
        ClientAuthMode::Disabled => {
            if find_extension(extensions, CLIENT_CERTIFICATE_TYPE_EXTENSION).is_some() {
                log::debug!("client authentication is disabled, ignoring client certificate types");
            }
            None
        }
        ClientAuthMode::Optional | ClientAuthMode::Required => Some(
            negotiator
                .role_mut(CertificateRole::Client)
                .select_from_extension(find_extension(extensions, CLIENT_CERTIFICATE_TYPE_EXTENSION))?,
        ),
    };

    let mut candidates = config
        .identities
        .iter()
        .filter(|identity| identity.certificate_type() == server_type)
        .peekable();

    if candidates.peek().is_none() {
        log::warn!("no {server_type} credential configured");
        return Err(TlsFatalAlert::new(AlertDescription::InternalError).into());
    }

    let identity = candidates
        .find(|identity| identity.is_accepted_by(&peer_algorithms))
        .ok_or_else(|| {
            log::warn!("no {server_type} credential signs with an algorithm the client accepts");
            TlsFatalAlert::new(AlertDescription::HandshakeFailure)
        })?;

    let mut random = [0; RANDOM_LEN];
    rng.fill_bytes(&mut random);

    let server_hello = Hello {
        random,
        extensions: negotiator
            .selection_extensions()
            .into_iter()
            .map(|(extension_type, data)| Extension::new(extension_type, data))
            .collect(),
    };
    record.write_handshake(HandshakeType::ServerHello, &server_hello)?;

    send_credential(record, server_type, Some(identity), ConnectionEnd::Server)?;

    if client_type.is_some() {
        let request = CertificateRequest {
            signature_algorithms: config.signature_algorithms.clone(),
        };
        record.write_handshake(HandshakeType::CertificateRequest, &request)?;
    }

    record.write_handshake(HandshakeType::ServerHelloDone, &ServerHelloDone)?;

    let peer_certificate = match client_type {
        Some(client_type) => {
            let certificate = receive_credential(
                record,
                client_type,
                ConnectionEnd::Client,
                config.validator.as_ref(),
                &config.signature_algorithms,
            )?;

            if certificate.is_none() && config.client_auth == ClientAuthMode::Required {
                log::warn!("client sent no certificate but one is required");
                return Err(TlsFatalAlert::new(AlertDescription::HandshakeFailure).into());
            }

            certificate
        }
        None => None,
    };

    receive_finished(record, ConnectionEnd::Client)?;
    send_finished(record, ConnectionEnd::Server)?;

    log::debug!(
        "server handshake complete: server {server_type}, client {client_type:?}, anonymous client: {}",
        peer_certificate.is_none()
    );

    Ok(HandshakeSummary {
        client_certificate_type: client_type,
        server_certificate_type: server_type,
        peer_certificate,
        peer_extensions: extensions.iter().map(|extension| extension.extension_type).collect(),
    })
}
