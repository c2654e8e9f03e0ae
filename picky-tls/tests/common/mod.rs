use p256::pkcs8::DecodePrivateKey as _;
use picky_tls::handshake::{
    accept, connect, ClientConfig, HandshakeError, HandshakeSummary, LocalIdentity, ServerConfig, SigningKey,
};
use rand::{RngCore as _, SeedableRng as _};
use rand_chacha::ChaCha8Rng;
use std::io::{self, Read, Write};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

/// One end of an in-memory duplex byte stream.
pub struct Pipe {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    position: usize,
}

pub fn duplex() -> (Pipe, Pipe) {
    let (a_tx, b_rx) = channel();
    let (b_tx, a_rx) = channel();

    let a = Pipe {
        tx: a_tx,
        rx: a_rx,
        pending: Vec::new(),
        position: 0,
    };
    let b = Pipe {
        tx: b_tx,
        rx: b_rx,
        pending: Vec::new(),
        position: 0,
    };

    (a, b)
}

impl Read for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.position == self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.position = 0;
                }
                // other end dropped
                Err(_) => return Ok(0),
            }
        }

        let available = &self.pending[self.position..];
        let len = available.len().min(buf.len());
        buf[..len].copy_from_slice(&available[..len]);
        self.position += len;

        Ok(len)
    }
}

impl Write for Pipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Raw public key identity and its encoded SubjectPublicKeyInfo.
pub fn ed25519_identity(seed: u64) -> (LocalIdentity, Vec<u8>) {
    let signing_key = ed25519_dalek::SigningKey::generate(&mut rng(seed));
    let identity = LocalIdentity::raw_public_key(SigningKey::Ed25519(signing_key)).unwrap();
    let spki = identity.entries()[0].clone();
    (identity, spki)
}

pub fn p256_identity(seed: u64) -> (LocalIdentity, Vec<u8>) {
    let signing_key = p256::ecdsa::SigningKey::random(&mut rng(seed));
    let identity = LocalIdentity::raw_public_key(SigningKey::EcdsaP256(signing_key)).unwrap();
    let spki = identity.entries()[0].clone();
    (identity, spki)
}

/// Self-signed X.509 identity and its DER certificate.
pub fn x509_identity() -> (LocalIdentity, Vec<u8>) {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
    let signing_key = p256::ecdsa::SigningKey::from_pkcs8_der(&certified.key_pair.serialize_der()).unwrap();
    let certificate = certified.cert.der().to_vec();
    let identity = LocalIdentity::x509(vec![certificate.clone()], SigningKey::EcdsaP256(signing_key)).unwrap();
    (identity, certificate)
}

/// Runs a handshake, then has the server echo 1000 random bytes sent by the client.
pub fn pump_data(client_config: ClientConfig, server_config: ServerConfig) -> (HandshakeSummary, HandshakeSummary) {
    let (client_pipe, server_pipe) = duplex();

    let server = thread::spawn(move || -> Result<HandshakeSummary, HandshakeError> {
        let mut stream = accept(&server_config, server_pipe, &mut rng(2))?;
        let summary = stream.summary().clone();

        let mut buffer = [0; 512];
        loop {
            let read = stream.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            stream.write_all(&buffer[..read])?;
        }

        // the client may already be gone
        let _ = stream.close();

        Ok(summary)
    });

    let mut stream = connect(&client_config, client_pipe, &mut rng(1)).unwrap();

    let mut data = vec![0; 1000];
    rng(3).fill_bytes(&mut data);
    stream.write_all(&data).unwrap();

    let mut echo = vec![0; data.len()];
    stream.read_exact(&mut echo).unwrap();
    assert_eq!(echo, data);

    stream.close().unwrap();
    let client_summary = stream.summary().clone();

    let server_summary = server.join().unwrap().unwrap();

    (client_summary, server_summary)
}

/// Runs a handshake expected to fail on both sides, returning (client error, server error).
pub fn failed_handshake(client_config: ClientConfig, server_config: ServerConfig) -> (HandshakeError, HandshakeError) {
    let (client_pipe, server_pipe) = duplex();

    let server = thread::spawn(move || accept(&server_config, server_pipe, &mut rng(2)).map(|_| ()));

    let client_error = match connect(&client_config, client_pipe, &mut rng(1)) {
        Ok(_) => panic!("client handshake unexpectedly succeeded"),
        Err(e) => e,
    };
    let server_error = match server.join().unwrap() {
        Ok(()) => panic!("server handshake unexpectedly succeeded"),
        Err(e) => e,
    };

    (client_error, server_error)
}
