//! Handshake message wire format

use crate::certificate_type::CertificateType;
use crate::signature::SignatureAndHashAlgorithm;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

pub const RANDOM_LEN: usize = 32;
pub const VERIFY_DATA_LEN: usize = 32;

/// `signature_algorithms` extension code point
pub const SIGNATURE_ALGORITHMS_EXTENSION: u16 = 13;

const U24_MAX: usize = (1 << 24) - 1;

#[derive(Debug, Error)]
pub enum CodecError {
    /// message ended early
    #[error("truncated message: {0}")]
    Truncated(#[from] io::Error),

    /// bytes left after the last field
    #[error("{len} unexpected trailing bytes in {element}")]
    TrailingData { element: &'static str, len: usize },

    /// length doesn't fit its prefix
    #[error("{element} too long: {len} bytes")]
    TooLong { element: &'static str, len: usize },

    /// semantically invalid content
    #[error("invalid {element}: {context}")]
    Invalid { element: &'static str, context: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandshakeType {
    ClientHello = 1,
    ServerHello = 2,
    Certificate = 11,
    CertificateRequest = 13,
    ServerHelloDone = 14,
    CertificateVerify = 15,
    Finished = 20,
}

impl HandshakeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        let handshake_type = match value {
            1 => Self::ClientHello,
            2 => Self::ServerHello,
            11 => Self::Certificate,
            13 => Self::CertificateRequest,
            14 => Self::ServerHelloDone,
            15 => Self::CertificateVerify,
            20 => Self::Finished,
            _ => return None,
        };

        Some(handshake_type)
    }
}

pub trait TlsReadExt {
    fn read_opaque16(&mut self) -> io::Result<Vec<u8>>;
    fn read_opaque24(&mut self) -> io::Result<Vec<u8>>;
}

impl<T> TlsReadExt for T
where
    T: Read,
{
    fn read_opaque16(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_u16::<BigEndian>()?;
        read_exact_vec(self, usize::from(len))
    }

    fn read_opaque24(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_u24::<BigEndian>()?;
        read_exact_vec(self, len as usize)
    }
}

fn read_exact_vec(stream: &mut impl Read, len: usize) -> io::Result<Vec<u8>> {
    let mut buffer = vec![0; len];
    stream.read_exact(&mut buffer)?;
    Ok(buffer)
}

pub trait TlsWriteExt {
    fn write_opaque16(&mut self, element: &'static str, data: &[u8]) -> Result<(), CodecError>;
    fn write_opaque24(&mut self, element: &'static str, data: &[u8]) -> Result<(), CodecError>;
}

impl<T> TlsWriteExt for T
where
    T: Write,
{
    fn write_opaque16(&mut self, element: &'static str, data: &[u8]) -> Result<(), CodecError> {
        let len = u16::try_from(data.len()).map_err(|_| CodecError::TooLong {
            element,
            len: data.len(),
        })?;
        self.write_u16::<BigEndian>(len)?;
        self.write_all(data)?;
        Ok(())
    }

    fn write_opaque24(&mut self, element: &'static str, data: &[u8]) -> Result<(), CodecError> {
        if data.len() > U24_MAX {
            return Err(CodecError::TooLong {
                element,
                len: data.len(),
            });
        }
        self.write_u24::<BigEndian>(data.len() as u32)?;
        self.write_all(data)?;
        Ok(())
    }
}

pub trait TlsMessage: Sized {
    const NAME: &'static str;

    fn decode(stream: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    fn encode(&self, stream: impl Write) -> Result<(), CodecError>;

    /// Decodes a whole message body, rejecting trailing bytes.
    fn from_body(body: &[u8]) -> Result<Self, CodecError> {
        let mut stream = Cursor::new(body);
        let message = Self::decode(&mut stream)?;
        ensure_consumed(&stream, Self::NAME)?;
        Ok(message)
    }

    fn to_body(&self) -> Result<Vec<u8>, CodecError> {
        let mut body = Vec::new();
        self.encode(&mut body)?;
        Ok(body)
    }
}

fn ensure_consumed(stream: &Cursor<&[u8]>, element: &'static str) -> Result<(), CodecError> {
    let remaining = stream.get_ref().len() - stream.position() as usize;
    if remaining == 0 {
        Ok(())
    } else {
        Err(CodecError::TrailingData {
            element,
            len: remaining,
        })
    }
}

/// Framed handshake message: `type u8 || u24 length || body`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessage {
    pub handshake_type: HandshakeType,
    pub body: Vec<u8>,
}

impl HandshakeMessage {
    pub fn new<M: TlsMessage>(handshake_type: HandshakeType, message: &M) -> Result<Self, CodecError> {
        Ok(Self {
            handshake_type,
            body: message.to_body()?,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::with_capacity(4 + self.body.len());
        bytes.push(self.handshake_type as u8);
        bytes.write_opaque24("handshake message", &self.body)?;
        Ok(bytes)
    }

    /// Splits one message off the front of `buffer`, if complete.
    pub fn split_from(buffer: &[u8]) -> Result<Option<(Self, usize)>, CodecError> {
        if buffer.len() < 4 {
            return Ok(None);
        }

        let handshake_type = HandshakeType::from_u8(buffer[0]).ok_or_else(|| CodecError::Invalid {
            element: "handshake message",
            context: format!("unknown handshake type {}", buffer[0]),
        })?;
        let len = (&buffer[1..4]).read_u24::<BigEndian>()? as usize;

        if buffer.len() < 4 + len {
            return Ok(None);
        }

        let message = Self {
            handshake_type,
            body: buffer[4..4 + len].to_vec(),
        };

        Ok(Some((message, 4 + len)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub extension_type: u16,
    pub data: Vec<u8>,
}

impl Extension {
    pub fn new(extension_type: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            extension_type,
            data: data.into(),
        }
    }
}

/// Data of the extension of the given type.
pub fn find_extension(extensions: &[Extension], extension_type: u16) -> Option<&[u8]> {
    extensions
        .iter()
        .find(|extension| extension.extension_type == extension_type)
        .map(|extension| extension.data.as_slice())
}

fn decode_extensions(stream: &mut Cursor<&[u8]>) -> Result<Vec<Extension>, CodecError> {
    if stream.position() as usize == stream.get_ref().len() {
        return Ok(Vec::new());
    }

    let block = stream.read_opaque16()?;
    let mut block = Cursor::new(block.as_slice());
    let mut extensions: Vec<Extension> = Vec::new();

    while (block.position() as usize) < block.get_ref().len() {
        let extension_type = block.read_u16::<BigEndian>()?;
        let data = block.read_opaque16()?;

        if extensions.iter().any(|e| e.extension_type == extension_type) {
            return Err(CodecError::Invalid {
                element: "extensions",
                context: format!("extension {extension_type} present twice"),
            });
        }

        extensions.push(Extension { extension_type, data });
    }

    Ok(extensions)
}

fn encode_extensions(extensions: &[Extension], mut stream: impl Write) -> Result<(), CodecError> {
    if extensions.is_empty() {
        return Ok(());
    }

    let mut block = Vec::new();
    for extension in extensions {
        block.write_u16::<BigEndian>(extension.extension_type)?;
        block.write_opaque16("extension data", &extension.data)?;
    }

    stream.write_opaque16("extensions", &block)
}

/// Extension block is omitted when empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    pub random: [u8; RANDOM_LEN],
    pub extensions: Vec<Extension>,
}

impl TlsMessage for Hello {
    const NAME: &'static str = "hello";

    fn decode(stream: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let mut random = [0; RANDOM_LEN];
        stream.read_exact(&mut random)?;
        let extensions = decode_extensions(stream)?;
        Ok(Self { random, extensions })
    }

    fn encode(&self, mut stream: impl Write) -> Result<(), CodecError> {
        stream.write_all(&self.random)?;
        encode_extensions(&self.extensions, stream)
    }
}

/// `u16 length || (hash u8 || signature u8)*`, unknown pairs are skipped.
pub fn decode_signature_algorithms(data: &[u8]) -> Result<Vec<SignatureAndHashAlgorithm>, CodecError> {
    let mut stream = Cursor::new(data);
    let list = stream.read_opaque16()?;
    ensure_consumed(&stream, "signature algorithms")?;

    if list.is_empty() || list.len() % 2 != 0 {
        return Err(CodecError::Invalid {
            element: "signature algorithms",
            context: format!("list length {} is not a positive even number", list.len()),
        });
    }

    let algorithms = list
        .chunks_exact(2)
        .filter_map(|pair| match SignatureAndHashAlgorithm::from_bytes([pair[0], pair[1]]) {
            Ok(algorithm) => Some(algorithm),
            Err(e) => {
                log::debug!("ignoring signature algorithm {}: {e}", hex::encode(pair));
                None
            }
        })
        .collect();

    Ok(algorithms)
}

pub fn encode_signature_algorithms(algorithms: &[SignatureAndHashAlgorithm]) -> Result<Vec<u8>, CodecError> {
    let list: Vec<u8> = algorithms.iter().flat_map(|algorithm| algorithm.to_bytes()).collect();
    let mut data = Vec::with_capacity(2 + list.len());
    data.write_opaque16("signature algorithms", &list)?;
    Ok(data)
}

/// Certificate message, whose layout depends on the negotiated certificate type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificatePayload {
    /// `u24 length || SubjectPublicKeyInfo`, zero length when no certificate is sent
    RawPublicKey(Option<Vec<u8>>),
    /// `u24 list length || (u24 length || certificate)*`, leaf first
    X509(Vec<Vec<u8>>),
}

impl CertificatePayload {
    pub fn empty(certificate_type: CertificateType) -> Self {
        match certificate_type {
            CertificateType::X509 => Self::X509(Vec::new()),
            CertificateType::RawPublicKey => Self::RawPublicKey(None),
        }
    }

    pub fn certificate_type(&self) -> CertificateType {
        match self {
            Self::RawPublicKey(_) => CertificateType::RawPublicKey,
            Self::X509(_) => CertificateType::X509,
        }
    }

    pub fn decode(certificate_type: CertificateType, body: &[u8]) -> Result<Self, CodecError> {
        let mut stream = Cursor::new(body);
        let block = stream.read_opaque24()?;
        ensure_consumed(&stream, "certificate")?;

        let payload = match certificate_type {
            CertificateType::RawPublicKey => Self::RawPublicKey((!block.is_empty()).then_some(block)),
            CertificateType::X509 => {
                let mut block = Cursor::new(block.as_slice());
                let mut chain = Vec::new();
                while (block.position() as usize) < block.get_ref().len() {
                    let certificate = block.read_opaque24()?;
                    if certificate.is_empty() {
                        return Err(CodecError::Invalid {
                            element: "certificate list",
                            context: "empty certificate entry".to_owned(),
                        });
                    }
                    chain.push(certificate);
                }
                Self::X509(chain)
            }
        };

        Ok(payload)
    }

    pub fn to_body(&self) -> Result<Vec<u8>, CodecError> {
        let block = match self {
            Self::RawPublicKey(spki) => spki.clone().unwrap_or_default(),
            Self::X509(chain) => {
                let mut block = Vec::new();
                for certificate in chain {
                    block.write_opaque24("certificate", certificate)?;
                }
                block
            }
        };

        let mut body = Vec::with_capacity(3 + block.len());
        body.write_opaque24("certificate list", &block)?;
        Ok(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub signature_algorithms: Vec<SignatureAndHashAlgorithm>,
}

impl TlsMessage for CertificateRequest {
    const NAME: &'static str = "certificate request";

    fn decode(stream: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let mut data = vec![];
        stream.read_to_end(&mut data)?;
        Ok(Self {
            signature_algorithms: decode_signature_algorithms(&data)?,
        })
    }

    fn encode(&self, mut stream: impl Write) -> Result<(), CodecError> {
        stream.write_all(&encode_signature_algorithms(&self.signature_algorithms)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateVerify {
    pub algorithm: SignatureAndHashAlgorithm,
    pub signature: Vec<u8>,
}

impl TlsMessage for CertificateVerify {
    const NAME: &'static str = "certificate verify";

    fn decode(stream: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let mut algorithm = [0; 2];
        stream.read_exact(&mut algorithm)?;
        let algorithm = SignatureAndHashAlgorithm::from_bytes(algorithm).map_err(|e| CodecError::Invalid {
            element: Self::NAME,
            context: e.to_string(),
        })?;
        let signature = stream.read_opaque16()?;

        Ok(Self { algorithm, signature })
    }

    fn encode(&self, mut stream: impl Write) -> Result<(), CodecError> {
        stream.write_all(&self.algorithm.to_bytes())?;
        stream.write_opaque16("signature", &self.signature)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub verify_data: [u8; VERIFY_DATA_LEN],
}

impl TlsMessage for Finished {
    const NAME: &'static str = "finished";

    fn decode(stream: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let mut verify_data = [0; VERIFY_DATA_LEN];
        stream.read_exact(&mut verify_data)?;
        Ok(Self { verify_data })
    }

    fn encode(&self, mut stream: impl Write) -> Result<(), CodecError> {
        stream.write_all(&self.verify_data)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHelloDone;

impl TlsMessage for ServerHelloDone {
    const NAME: &'static str = "server hello done";

    fn decode(_: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self)
    }

    fn encode(&self, _: impl Write) -> Result<(), CodecError> {
        Ok(())
    }
}
