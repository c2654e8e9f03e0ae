use super::record::{ContentType, ReceivedAlert, RecordLayer, MAX_FRAGMENT_LEN};
use super::{HandshakeError, HandshakeSummary};
use crate::alert::{AlertDescription, AlertLevel, TlsFatalAlert};
use std::io::{self, Read, Write};

/// Application data channel of a completed handshake.
///
/// Reading returns end of file once the peer sent `close_notify`.
pub struct TlsStream<S> {
    record: RecordLayer<S>,
    summary: HandshakeSummary,
    incoming: Vec<u8>,
    position: usize,
    peer_closed: bool,
    closed: bool,
}

impl<S> TlsStream<S>
where
    S: Read + Write,
{
    pub(crate) fn new(record: RecordLayer<S>, summary: HandshakeSummary) -> Self {
        Self {
            record,
            summary,
            incoming: Vec::new(),
            position: 0,
            peer_closed: false,
            closed: false,
        }
    }

    pub fn summary(&self) -> &HandshakeSummary {
        &self.summary
    }

    pub fn get_ref(&self) -> &S {
        self.record.get_ref()
    }

    pub fn into_inner(self) -> S {
        self.record.into_inner()
    }

    /// Sends `close_notify`; nothing can be written afterwards.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.record.send_alert(AlertLevel::Warning, AlertDescription::CloseNotify)
    }

    fn fail(&mut self, alert: TlsFatalAlert) -> io::Error {
        self.peer_closed = true;
        let error = self.record.abort(HandshakeError::Fatal(alert));
        io::Error::new(io::ErrorKind::InvalidData, error)
    }
}

impl<S> Read for TlsStream<S>
where
    S: Read + Write,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.position == self.incoming.len() {
            if self.peer_closed {
                return Ok(0);
            }

            let (content_type, fragment) = match self.record.read_record() {
                Ok(record) => record,
                Err(HandshakeError::Fatal(alert)) => return Err(self.fail(alert)),
                Err(HandshakeError::Io(e)) => return Err(e),
                Err(e @ HandshakeError::AlertReceived { .. }) => {
                    return Err(io::Error::new(io::ErrorKind::ConnectionAborted, e))
                }
            };

            match content_type {
                ContentType::ApplicationData => {
                    self.incoming = fragment;
                    self.position = 0;
                }
                ContentType::Alert => match RecordLayer::<S>::parse_alert(&fragment) {
                    Ok(ReceivedAlert::CloseNotify) => {
                        log::debug!("peer closed the connection");
                        self.peer_closed = true;
                    }
                    Ok(ReceivedAlert::Warning(description)) => log::debug!("ignoring warning alert {description}"),
                    Ok(ReceivedAlert::Fatal(description)) => {
                        self.peer_closed = true;
                        return Err(io::Error::new(
                            io::ErrorKind::ConnectionAborted,
                            HandshakeError::AlertReceived { description },
                        ));
                    }
                    Err(alert) => return Err(self.fail(alert)),
                },
                ContentType::Handshake => {
                    log::warn!("handshake message after the handshake completed");
                    return Err(self.fail(TlsFatalAlert::new(AlertDescription::UnexpectedMessage)));
                }
            }
        }

        let available = &self.incoming[self.position..];
        let len = available.len().min(buf.len());
        buf[..len].copy_from_slice(&available[..len]);
        self.position += len;

        Ok(len)
    }
}

impl<S> Write for TlsStream<S>
where
    S: Read + Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "close_notify already sent"));
        }

        let len = buf.len().min(MAX_FRAGMENT_LEN);
        self.record.write_record(ContentType::ApplicationData, &buf[..len])?;

        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.record.flush()
    }
}
