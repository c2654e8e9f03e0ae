//! Record framing over a blocking transport

use super::codec::{CodecError, HandshakeMessage, HandshakeType, TlsMessage};
use super::HandshakeError;
use crate::alert::{AlertDescription, AlertLevel, TlsFatalAlert};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

pub const MAX_FRAGMENT_LEN: usize = 1 << 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl ContentType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            21 => Some(Self::Alert),
            22 => Some(Self::Handshake),
            23 => Some(Self::ApplicationData),
            _ => None,
        }
    }
}

/// What an alert record asks of the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceivedAlert {
    CloseNotify,
    Warning(AlertDescription),
    Fatal(AlertDescription),
}

/// Running hash of every handshake message sent and received.
#[derive(Clone, Default)]
pub struct Transcript {
    hasher: Sha256,
}

impl Transcript {
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    pub fn current_hash(&self) -> [u8; 32] {
        self.hasher.clone().finalize().into()
    }
}

pub struct RecordLayer<S> {
    stream: S,
    handshake_buffer: Vec<u8>,
    transcript: Transcript,
}

impl<S> RecordLayer<S>
where
    S: Read + Write,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            handshake_buffer: Vec::new(),
            transcript: Transcript::default(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Writes `data` as one or more records of at most 2^14 bytes.
    pub fn write_record(&mut self, content_type: ContentType, data: &[u8]) -> io::Result<()> {
        for fragment in data.chunks(MAX_FRAGMENT_LEN) {
            let mut record = Vec::with_capacity(3 + fragment.len());
            record.write_u8(content_type as u8)?;
            // at most 2^14
            record.write_u16::<BigEndian>(fragment.len() as u16)?;
            record.extend_from_slice(fragment);
            self.stream.write_all(&record)?;
        }

        self.stream.flush()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }

    pub fn read_record(&mut self) -> Result<(ContentType, Vec<u8>), HandshakeError> {
        let raw_content_type = self.stream.read_u8()?;
        let len = usize::from(self.stream.read_u16::<BigEndian>()?);

        let content_type = ContentType::from_u8(raw_content_type).ok_or_else(|| {
            log::warn!("unexpected record content type {raw_content_type}");
            TlsFatalAlert::new(AlertDescription::UnexpectedMessage)
        })?;

        if len > MAX_FRAGMENT_LEN {
            log::warn!("record of {len} bytes exceeds the fragment limit");
            return Err(TlsFatalAlert::new(AlertDescription::DecodeError).into());
        }

        let mut fragment = vec![0; len];
        self.stream.read_exact(&mut fragment)?;

        Ok((content_type, fragment))
    }

    pub fn send_alert(&mut self, level: AlertLevel, description: AlertDescription) -> io::Result<()> {
        self.write_record(ContentType::Alert, &[level.to_u8(), description.to_u8()])
    }

    /// Sends the alert for a locally raised failure, then hands the error back.
    ///
    /// The transport may already be gone, so a failed send is only logged.
    pub fn abort(&mut self, error: HandshakeError) -> HandshakeError {
        if let HandshakeError::Fatal(alert) = &error {
            if let Err(e) = self.send_alert(AlertLevel::Fatal, alert.description()) {
                log::debug!("couldn't send {} to peer: {e}", alert.description());
            }
        }

        error
    }

    pub fn parse_alert(fragment: &[u8]) -> Result<ReceivedAlert, TlsFatalAlert> {
        let [level, description] = fragment else {
            log::warn!("alert record of {} bytes", fragment.len());
            return Err(AlertDescription::DecodeError.into());
        };

        let level = AlertLevel::from_u8(*level);
        let description = AlertDescription::from_u8(*description);

        match (level, description) {
            (_, Some(AlertDescription::CloseNotify)) => Ok(ReceivedAlert::CloseNotify),
            (Some(AlertLevel::Warning), Some(description)) => Ok(ReceivedAlert::Warning(description)),
            (Some(AlertLevel::Fatal), Some(description)) => Ok(ReceivedAlert::Fatal(description)),
            _ => {
                log::warn!("malformed alert: {}", hex::encode(fragment));
                Err(AlertDescription::DecodeError.into())
            }
        }
    }

    /// Sends a handshake message and adds it to the transcript.
    pub fn write_handshake<M: TlsMessage>(
        &mut self,
        handshake_type: HandshakeType,
        message: &M,
    ) -> Result<(), HandshakeError> {
        let message = HandshakeMessage::new(handshake_type, message).map_err(encode_failure)?;
        self.write_handshake_message(&message)
    }

    pub fn write_handshake_message(&mut self, message: &HandshakeMessage) -> Result<(), HandshakeError> {
        let bytes = message.to_bytes().map_err(encode_failure)?;
        log::debug!("sending {:?} ({} bytes)", message.handshake_type, message.body.len());
        self.transcript.update(&bytes);
        self.write_record(ContentType::Handshake, &bytes)
            .map_err(|e| self.pending_alert_or(e))
    }

    /// A peer that raised a fatal alert may hang up while this side is still writing: the alert
    /// already queued on the read side is reported instead of the write error.
    fn pending_alert_or(&mut self, write_error: io::Error) -> HandshakeError {
        log::debug!("write failed ({write_error}), looking for an alert from the peer");

        loop {
            match self.read_record() {
                Ok((ContentType::Alert, fragment)) => match Self::parse_alert(&fragment) {
                    Ok(ReceivedAlert::Warning(description)) => log::debug!("ignoring warning alert {description}"),
                    Ok(ReceivedAlert::CloseNotify) => {
                        return HandshakeError::AlertReceived {
                            description: AlertDescription::CloseNotify,
                        }
                    }
                    Ok(ReceivedAlert::Fatal(description)) => return HandshakeError::AlertReceived { description },
                    Err(_) => return write_error.into(),
                },
                // unread handshake data ahead of the alert
                Ok(_) => continue,
                Err(_) => return write_error.into(),
            }
        }
    }

    /// Next handshake message, which must be of the given type.
    pub fn expect_handshake(&mut self, expected: HandshakeType) -> Result<Vec<u8>, HandshakeError> {
        let message = self.read_handshake_message()?;

        if message.handshake_type != expected {
            log::warn!("expected {expected:?}, received {:?}", message.handshake_type);
            return Err(TlsFatalAlert::new(AlertDescription::UnexpectedMessage).into());
        }

        Ok(message.body)
    }

    pub fn read_handshake_message(&mut self) -> Result<HandshakeMessage, HandshakeError> {
        loop {
            if let Some((message, consumed)) =
                HandshakeMessage::split_from(&self.handshake_buffer).map_err(decode_failure)?
            {
                self.transcript.update(&self.handshake_buffer[..consumed]);
                self.handshake_buffer.drain(..consumed);
                log::debug!("received {:?} ({} bytes)", message.handshake_type, message.body.len());
                return Ok(message);
            }

            match self.read_record()? {
                (ContentType::Handshake, fragment) => self.handshake_buffer.extend_from_slice(&fragment),
                (ContentType::Alert, fragment) => match Self::parse_alert(&fragment)? {
                    ReceivedAlert::Warning(description) => log::debug!("ignoring warning alert {description}"),
                    ReceivedAlert::CloseNotify => {
                        return Err(HandshakeError::AlertReceived {
                            description: AlertDescription::CloseNotify,
                        })
                    }
                    ReceivedAlert::Fatal(description) => return Err(HandshakeError::AlertReceived { description }),
                },
                (ContentType::ApplicationData, _) => {
                    log::warn!("application data before the end of the handshake");
                    return Err(TlsFatalAlert::new(AlertDescription::UnexpectedMessage).into());
                }
            }
        }
    }
}

pub(crate) fn decode_failure(error: CodecError) -> TlsFatalAlert {
    log::warn!("malformed handshake message: {error}");
    TlsFatalAlert::with_source(AlertDescription::DecodeError, error)
}

pub(crate) fn encode_failure(error: CodecError) -> TlsFatalAlert {
    log::warn!("couldn't encode handshake message: {error}");
    TlsFatalAlert::with_source(AlertDescription::InternalError, error)
}
