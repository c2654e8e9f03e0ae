mod common;

use common::{ed25519_identity, failed_handshake, p256_identity, pump_data, x509_identity};
use picky_tls::certificate_type::{CLIENT_CERTIFICATE_TYPE_EXTENSION, SERVER_CERTIFICATE_TYPE_EXTENSION};
use picky_tls::handshake::{
    ClientAuthMode, ClientConfig, HandshakeError, PinnedCertificates, ServerConfig, SIGNATURE_ALGORITHMS_EXTENSION,
};
use picky_tls::{AlertDescription, CertificateType, CertificateTypeConfig, CertificateTypeList};
use std::sync::Arc;

fn types(types: &[CertificateType]) -> Option<CertificateTypeList> {
    Some(CertificateTypeList::new(types.to_vec()).unwrap())
}

fn pins() -> PinnedCertificates {
    PinnedCertificates::new()
}

fn assert_alert_exchanged(
    client: HandshakeError,
    server: HandshakeError,
    raised_by_server: bool,
    expected: AlertDescription,
) {
    let (raiser, receiver) = if raised_by_server { (server, client) } else { (client, server) };

    assert!(
        matches!(&raiser, HandshakeError::Fatal(alert) if alert.description() == expected),
        "raising side: {raiser:?}"
    );
    assert!(
        matches!(&receiver, HandshakeError::AlertReceived { description } if *description == expected),
        "receiving side: {receiver:?}"
    );
}

#[test]
fn client_sends_extension_but_server_does_not_support_it() {
    let (server_identity, server_certificate) = x509_identity();

    let mut client = ClientConfig::new(Arc::new(pins().with_x509_certificate(server_certificate)));
    client.certificate_types.client_certificate_types = types(&[CertificateType::RawPublicKey, CertificateType::X509]);
    let server = ServerConfig::new(vec![server_identity], Arc::new(pins()));

    let (client_summary, server_summary) = pump_data(client, server);

    assert!(server_summary.peer_sent_extension(CLIENT_CERTIFICATE_TYPE_EXTENSION));
    assert!(!client_summary.peer_sent_extension(CLIENT_CERTIFICATE_TYPE_EXTENSION));
    assert_eq!(client_summary.server_certificate_type(), CertificateType::X509);
    assert_eq!(client_summary.client_certificate_type(), None);
    assert!(server_summary.peer_certificate().is_none());
}

#[test]
fn extensions_are_omitted_if_specified_but_only_contain_x509() {
    let (server_identity, server_certificate) = x509_identity();
    let (client_identity, client_certificate) = x509_identity();

    let x509_only = CertificateTypeConfig {
        client_certificate_types: types(&[CertificateType::X509]),
        server_certificate_types: types(&[CertificateType::X509]),
    };

    let mut client = ClientConfig::new(Arc::new(pins().with_x509_certificate(server_certificate)));
    client.certificate_types = x509_only.clone();
    client.identities = vec![client_identity];

    let mut server = ServerConfig::new(
        vec![server_identity],
        Arc::new(pins().with_x509_certificate(client_certificate.clone())),
    );
    server.certificate_types = x509_only;
    server.client_auth = ClientAuthMode::Required;

    let (client_summary, server_summary) = pump_data(client, server);

    assert!(
        !server_summary.peer_sent_extension(CLIENT_CERTIFICATE_TYPE_EXTENSION),
        "client cert type extension should not be sent"
    );
    assert!(
        !server_summary.peer_sent_extension(SERVER_CERTIFICATE_TYPE_EXTENSION),
        "server cert type extension should not be sent"
    );
    assert_eq!(server_summary.peer_extensions(), &[SIGNATURE_ALGORITHMS_EXTENSION]);
    assert!(client_summary.peer_extensions().is_empty());

    let peer = server_summary.peer_certificate().unwrap();
    assert_eq!(peer.certificate_type(), CertificateType::X509);
    assert_eq!(peer.entries(), &[client_certificate]);
}

#[test]
fn both_sides_use_raw_key() {
    let (server_identity, server_spki) = ed25519_identity(10);
    let (client_identity, client_spki) = ed25519_identity(11);

    let mut client = ClientConfig::new(Arc::new(pins().with_raw_public_key(server_spki.clone())));
    client.certificate_types = CertificateTypeConfig::raw_public_key_only();
    client.identities = vec![client_identity];

    let mut server = ServerConfig::new(
        vec![server_identity],
        Arc::new(pins().with_raw_public_key(client_spki.clone())),
    );
    server.certificate_types = CertificateTypeConfig::raw_public_key_only();
    server.client_auth = ClientAuthMode::Required;

    let (client_summary, server_summary) = pump_data(client, server);

    for summary in [&client_summary, &server_summary] {
        assert_eq!(summary.server_certificate_type(), CertificateType::RawPublicKey);
        assert_eq!(summary.client_certificate_type(), Some(CertificateType::RawPublicKey));
    }

    assert_eq!(
        client_summary.peer_certificate().unwrap().public_key().encoded(),
        server_spki.as_slice()
    );
    assert_eq!(
        server_summary.peer_certificate().unwrap().public_key().encoded(),
        client_spki.as_slice()
    );
}

#[test]
fn ecdsa_raw_keys() {
    let (server_identity, server_spki) = p256_identity(20);
    let (client_identity, client_spki) = p256_identity(21);

    let mut client = ClientConfig::new(Arc::new(pins().with_raw_public_key(server_spki)));
    client.certificate_types = CertificateTypeConfig::raw_public_key_only();
    client.identities = vec![client_identity];

    let mut server = ServerConfig::new(vec![server_identity], Arc::new(pins().with_raw_public_key(client_spki)));
    server.certificate_types = CertificateTypeConfig::raw_public_key_only();
    server.client_auth = ClientAuthMode::Required;

    let (_, server_summary) = pump_data(client, server);
    assert_eq!(
        server_summary.peer_certificate().unwrap().certificate_type(),
        CertificateType::RawPublicKey
    );
}

#[test]
fn server_uses_raw_key_and_client_is_anonymous() {
    let (server_identity, server_spki) = ed25519_identity(30);

    let mut client = ClientConfig::new(Arc::new(pins().with_raw_public_key(server_spki)));
    client.certificate_types = CertificateTypeConfig::raw_public_key_only();

    let mut server = ServerConfig::new(vec![server_identity], Arc::new(pins()));
    server.certificate_types = CertificateTypeConfig::raw_public_key_only();
    server.client_auth = ClientAuthMode::Optional;

    let (client_summary, server_summary) = pump_data(client, server);

    assert_eq!(client_summary.client_certificate_type(), Some(CertificateType::RawPublicKey));
    assert_eq!(server_summary.client_certificate_type(), Some(CertificateType::RawPublicKey));
    assert!(server_summary.peer_certificate().is_none());
}

#[test]
fn server_uses_raw_key_and_client_uses_x509() {
    let (server_identity, server_spki) = ed25519_identity(40);
    let (client_identity, client_certificate) = x509_identity();

    let mut client = ClientConfig::new(Arc::new(pins().with_raw_public_key(server_spki)));
    client.certificate_types.server_certificate_types = types(&[CertificateType::RawPublicKey]);
    client.identities = vec![client_identity];

    let mut server = ServerConfig::new(
        vec![server_identity],
        Arc::new(pins().with_x509_certificate(client_certificate)),
    );
    server.certificate_types.server_certificate_types = types(&[CertificateType::RawPublicKey]);
    server.client_auth = ClientAuthMode::Required;

    let (client_summary, server_summary) = pump_data(client, server);

    assert_eq!(client_summary.server_certificate_type(), CertificateType::RawPublicKey);
    assert_eq!(server_summary.client_certificate_type(), Some(CertificateType::X509));
    assert_eq!(
        server_summary.peer_certificate().unwrap().certificate_type(),
        CertificateType::X509
    );
}

#[test]
fn server_uses_x509_and_client_uses_raw_key() {
    let (server_identity, server_certificate) = x509_identity();
    let (client_identity, client_spki) = ed25519_identity(50);

    let mut client = ClientConfig::new(Arc::new(pins().with_x509_certificate(server_certificate)));
    client.certificate_types.client_certificate_types = types(&[CertificateType::RawPublicKey]);
    client.identities = vec![client_identity];

    let mut server = ServerConfig::new(vec![server_identity], Arc::new(pins().with_raw_public_key(client_spki)));
    server.certificate_types.client_certificate_types = types(&[CertificateType::RawPublicKey]);
    server.client_auth = ClientAuthMode::Required;

    let (client_summary, server_summary) = pump_data(client, server);

    assert_eq!(client_summary.server_certificate_type(), CertificateType::X509);
    assert_eq!(client_summary.client_certificate_type(), Some(CertificateType::RawPublicKey));
    assert!(client_summary.peer_sent_extension(CLIENT_CERTIFICATE_TYPE_EXTENSION));
    assert!(!client_summary.peer_sent_extension(SERVER_CERTIFICATE_TYPE_EXTENSION));
    assert_eq!(
        server_summary.peer_certificate().unwrap().certificate_type(),
        CertificateType::RawPublicKey
    );
}

#[test]
fn selection_follows_client_preference() {
    let (raw_identity, raw_spki) = ed25519_identity(60);
    let (x509_identity, x509_certificate) = x509_identity();

    let mut client = ClientConfig::new(Arc::new(
        pins()
            .with_raw_public_key(raw_spki)
            .with_x509_certificate(x509_certificate),
    ));
    client.certificate_types.server_certificate_types = types(&[CertificateType::X509, CertificateType::RawPublicKey]);

    let mut server = ServerConfig::new(vec![raw_identity, x509_identity], Arc::new(pins()));
    server.certificate_types.server_certificate_types =
        types(&[CertificateType::RawPublicKey, CertificateType::X509]);

    let (client_summary, _) = pump_data(client, server);
    assert_eq!(client_summary.server_certificate_type(), CertificateType::X509);
}

#[test]
fn client_sends_client_cert_extension_but_server_has_no_common_types() {
    let (server_identity, server_certificate) = x509_identity();
    let (client_identity, _) = ed25519_identity(70);

    let mut client = ClientConfig::new(Arc::new(pins().with_x509_certificate(server_certificate)));
    client.certificate_types.client_certificate_types = types(&[CertificateType::RawPublicKey]);
    client.identities = vec![client_identity];

    let mut server = ServerConfig::new(vec![server_identity], Arc::new(pins()));
    server.certificate_types.client_certificate_types = types(&[CertificateType::X509]);
    server.client_auth = ClientAuthMode::Required;

    let (client_error, server_error) = failed_handshake(client, server);
    assert_alert_exchanged(client_error, server_error, true, AlertDescription::UnsupportedCertificate);
}

#[test]
fn client_sends_server_cert_extension_but_server_has_no_common_types() {
    let (server_identity, _) = x509_identity();

    let mut client = ClientConfig::new(Arc::new(pins()));
    client.certificate_types.server_certificate_types = types(&[CertificateType::RawPublicKey]);

    let server = ServerConfig::new(vec![server_identity], Arc::new(pins()));

    let (client_error, server_error) = failed_handshake(client, server);
    assert_alert_exchanged(client_error, server_error, true, AlertDescription::UnsupportedCertificate);
}

#[test]
fn required_client_certificate_missing() {
    let (server_identity, server_spki) = ed25519_identity(80);

    let mut client = ClientConfig::new(Arc::new(pins().with_raw_public_key(server_spki)));
    client.certificate_types = CertificateTypeConfig::raw_public_key_only();

    let mut server = ServerConfig::new(vec![server_identity], Arc::new(pins()));
    server.certificate_types = CertificateTypeConfig::raw_public_key_only();
    server.client_auth = ClientAuthMode::Required;

    let (client_error, server_error) = failed_handshake(client, server);
    assert_alert_exchanged(client_error, server_error, true, AlertDescription::HandshakeFailure);
}

#[test]
fn untrusted_server_key() {
    let (server_identity, _) = ed25519_identity(90);
    let (_, other_spki) = ed25519_identity(91);

    let mut client = ClientConfig::new(Arc::new(pins().with_raw_public_key(other_spki)));
    client.certificate_types.server_certificate_types = types(&[CertificateType::RawPublicKey]);

    let mut server = ServerConfig::new(vec![server_identity], Arc::new(pins()));
    server.certificate_types.server_certificate_types = types(&[CertificateType::RawPublicKey]);

    let (client_error, server_error) = failed_handshake(client, server);
    assert_alert_exchanged(client_error, server_error, false, AlertDescription::BadCertificate);
}

#[test]
fn missing_server_identity_for_negotiated_type() {
    let (server_identity, _) = x509_identity();

    let mut client = ClientConfig::new(Arc::new(pins()));
    client.certificate_types.server_certificate_types = types(&[CertificateType::RawPublicKey]);

    let mut server = ServerConfig::new(vec![server_identity], Arc::new(pins()));
    server.certificate_types.server_certificate_types =
        types(&[CertificateType::RawPublicKey, CertificateType::X509]);

    let (client_error, server_error) = failed_handshake(client, server);
    assert_alert_exchanged(client_error, server_error, true, AlertDescription::InternalError);
}

#[test]
fn no_offer_negotiates_x509_whatever_the_server_prefers() {
    let (server_identity, server_certificate) = x509_identity();
    let (client_identity, client_certificate) = x509_identity();

    let mut client = ClientConfig::new(Arc::new(pins().with_x509_certificate(server_certificate)));
    client.identities = vec![client_identity];

    let mut server = ServerConfig::new(
        vec![server_identity],
        Arc::new(pins().with_x509_certificate(client_certificate)),
    );
    server.certificate_types.client_certificate_types = types(&[CertificateType::RawPublicKey]);
    server.client_auth = ClientAuthMode::Required;

    let (client_summary, server_summary) = pump_data(client, server);

    assert!(!server_summary.peer_sent_extension(CLIENT_CERTIFICATE_TYPE_EXTENSION));
    assert!(!client_summary.peer_sent_extension(CLIENT_CERTIFICATE_TYPE_EXTENSION));
    for summary in [&client_summary, &server_summary] {
        assert_eq!(summary.client_certificate_type(), Some(CertificateType::X509));
        assert_eq!(summary.server_certificate_type(), CertificateType::X509);
    }
    assert_eq!(
        server_summary.peer_certificate().unwrap().certificate_type(),
        CertificateType::X509
    );
}

#[test]
fn alert_reaches_peer_that_is_still_writing() {
    // the side receiving the alert is usually mid-flight when the raising side hangs up
    for _ in 0..25 {
        required_client_certificate_missing();
        untrusted_server_key();
    }
}
