//! Client side of the handshake

use super::codec::{
    encode_signature_algorithms, find_extension, CertificateRequest, Extension, HandshakeType, Hello, ServerHelloDone,
    TlsMessage, RANDOM_LEN, SIGNATURE_ALGORITHMS_EXTENSION,
};
use super::record::{decode_failure, encode_failure, RecordLayer};
use super::{
    default_signature_algorithms, receive_credential, receive_finished, send_credential, send_finished,
    HandshakeError, HandshakeSummary, LocalIdentity, PeerCertificateValidator, TlsStream,
};
use crate::alert::{AlertDescription, TlsFatalAlert};
use crate::certificate::ConnectionEnd;
use crate::certificate_type::{CertificateType, CLIENT_CERTIFICATE_TYPE_EXTENSION, SERVER_CERTIFICATE_TYPE_EXTENSION};
use crate::config::CertificateTypeConfig;
use crate::negotiation::{CertificateRole, CertificateTypeNegotiator, ClientCertificate};
use crate::signature::SignatureAndHashAlgorithm;
use rand_core::{CryptoRng, RngCore};
use std::io::{Read, Write};
use std::sync::Arc;

#[derive(Clone)]
pub struct ClientConfig {
    pub certificate_types: CertificateTypeConfig,
    /// Credentials offered when the server asks for one, first match wins
    pub identities: Vec<LocalIdentity>,
    pub validator: Arc<dyn PeerCertificateValidator>,
    /// Accepted for the server CertificateVerify, and advertised in `signature_algorithms`
    pub signature_algorithms: Vec<SignatureAndHashAlgorithm>,
}

impl ClientConfig {
    pub fn new(validator: Arc<dyn PeerCertificateValidator>) -> Self {
        Self {
            certificate_types: CertificateTypeConfig::default(),
            identities: Vec::new(),
            validator,
            signature_algorithms: default_signature_algorithms(),
        }
    }
}

/// Runs the client handshake over `stream`.
///
/// A locally raised fatal alert is sent to the server before returning.
pub fn connect<S, R>(config: &ClientConfig, stream: S, rng: &mut R) -> Result<TlsStream<S>, HandshakeError>
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
    config: &ClientConfig,
    record: &mut RecordLayer<S>,
    rng: &mut R,
) -> Result<HandshakeSummary, HandshakeError>
where
    S: Read + Write,
    R: RngCore + CryptoRng,
{
    let mut negotiator = CertificateTypeNegotiator::new(&config.certificate_types);

    let mut random = [0; RANDOM_LEN];
    rng.fill_bytes(&mut random);

    let offers = negotiator.offer_extensions();
    let offered_types: Vec<u16> = offers.iter().map(|(extension_type, _)| *extension_type).collect();

    let mut extensions = vec![Extension::new(
        SIGNATURE_ALGORITHMS_EXTENSION,
        encode_signature_algorithms(&config.signature_algorithms).map_err(encode_failure)?,
    )];
    extensions.extend(
        offers
            .into_iter()
            .map(|(extension_type, data)| Extension::new(extension_type, data)),
    );

    record.write_handshake(HandshakeType::ClientHello, &Hello { random, extensions })?;

    let body = record.expect_handshake(HandshakeType::ServerHello)?;
    let server_hello = Hello::from_body(&body).map_err(decode_failure)?;

    if let Some(unsolicited) = server_hello
        .extensions
        .iter()
        .find(|extension| !offered_types.contains(&extension.extension_type))
    {
        log::warn!("server sent extension {} which wasn't offered", unsolicited.extension_type);
        return Err(TlsFatalAlert::new(AlertDescription::UnsupportedExtension).into());
    }

    let server_type = negotiator
        .role_mut(CertificateRole::Server)
        .process_selection(find_extension(&server_hello.extensions, SERVER_CERTIFICATE_TYPE_EXTENSION))?;

    // without an echo, the client role is only settled if a certificate is requested
    if let Some(echo) = find_extension(&server_hello.extensions, CLIENT_CERTIFICATE_TYPE_EXTENSION) {
        negotiator
            .role_mut(CertificateRole::Client)
            .process_selection(Some(echo))?;
    }

    let server_certificate = receive_credential(
        record,
        server_type,
        ConnectionEnd::Server,
        config.validator.as_ref(),
        &config.signature_algorithms,
    )?
    .ok_or_else(|| {
        log::warn!("server sent an empty certificate");
        TlsFatalAlert::new(AlertDescription::BadCertificate)
    })?;

    let message = record.read_handshake_message()?;
    let certificate_request = match message.handshake_type {
        HandshakeType::CertificateRequest => {
            let request = CertificateRequest::from_body(&message.body).map_err(decode_failure)?;
            let body = record.expect_handshake(HandshakeType::ServerHelloDone)?;
            ServerHelloDone::from_body(&body).map_err(decode_failure)?;
            Some(request)
        }
        HandshakeType::ServerHelloDone => {
            ServerHelloDone::from_body(&message.body).map_err(decode_failure)?;
            None
        }
        other => {
            log::warn!("expected CertificateRequest or ServerHelloDone, received {other:?}");
            return Err(TlsFatalAlert::new(AlertDescription::UnexpectedMessage).into());
        }
    };

    let client_type = match certificate_request {
        Some(request) => {
            let client_role = negotiator.role_mut(CertificateRole::Client);
            let client_type = match client_role.resolved() {
                Some(client_type) => client_type,
                None => client_role.process_selection(None)?,
            };

            Some(send_client_credential(config, record, client_type, &request)?)
        }
        None => None,
    };

    send_finished(record, ConnectionEnd::Client)?;
    receive_finished(record, ConnectionEnd::Server)?;

    log::debug!("client handshake complete: server {server_type}, client {client_type:?}");

    Ok(HandshakeSummary {
        client_certificate_type: client_type,
        server_certificate_type: server_type,
        peer_certificate: Some(server_certificate),
        peer_extensions: server_hello
            .extensions
            .iter()
            .map(|extension| extension.extension_type)
            .collect(),
    })
}

fn send_client_credential<S: Read + Write>(
    config: &ClientConfig,
    record: &mut RecordLayer<S>,
    client_type: CertificateType,
    request: &CertificateRequest,
) -> Result<CertificateType, HandshakeError> {
    let candidates = config
        .identities
        .iter()
        .filter(|identity| identity.is_accepted_by(&request.signature_algorithms));

    let identity = match ClientCertificate::choose(client_type, candidates, LocalIdentity::certificate_type) {
        ClientCertificate::Present(identity) => Some(identity),
        ClientCertificate::Anonymous => {
            log::debug!("no usable {client_type} credential, continuing anonymously");
            None
        }
    };

    send_credential(record, client_type, identity, ConnectionEnd::Client)?;

    Ok(client_type)
}
