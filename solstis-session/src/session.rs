//! Request/reply session over a single controller connection
//!
//! The protocol is half-duplex: at most one request is outstanding, and
//! replies arrive in request order. The only exception is the stream of
//! `automatic_output` pushes during a TeraScan with automatic output
//! enabled. Pushes that arrive while a reply is awaited are queued and
//! handed out later by [`Session::receive_unsolicited`].
//!
//! After a timeout or framing error the byte alignment of the stream is
//! suspect. Nothing resynchronizes automatically; close and reopen.

use crate::envelope::{Envelope, AUTOMATIC_OUTPUT_OP};
use crate::error::{SolstisError, SolstisResult};
use crate::framer::FrameExtractor;
use crate::statistics::SessionStatistics;
use serde_json::Value;
use solstis_transport::TransportLayer;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Read timeout used when none is configured
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK_SIZE: usize = 1024;

/// The single request awaiting its reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub op: String,
    pub transmission_id: u32,
}

/// Session owning one transport, its residual bytes and the unsolicited queue
#[derive(Debug)]
pub struct Session<T: TransportLayer> {
    transport: T,
    extractor: FrameExtractor,
    read_timeout: Duration,
    pending: Option<PendingRequest>,
    unsolicited: VecDeque<Envelope>,
    statistics: SessionStatistics,
    closed: bool,
}

impl<T: TransportLayer> Session<T> {
    /// Create a session over a transport that is not yet open
    pub fn new(transport: T, read_timeout: Duration) -> Self {
        Self {
            transport,
            extractor: FrameExtractor::new(),
            read_timeout,
            pending: None,
            unsolicited: VecDeque::new(),
            statistics: SessionStatistics::new(),
            closed: true,
        }
    }

    /// Create a session over a transport that is already open
    pub fn from_open(transport: T, read_timeout: Duration) -> Self {
        let mut session = Self::new(transport, read_timeout);
        session.closed = false;
        session
    }

    /// Open the underlying transport
    pub async fn open(&mut self) -> SolstisResult<()> {
        self.transport.open().await?;
        self.closed = false;
        Ok(())
    }

    /// Send one request
    ///
    /// The envelope is written in full and flushed within the read timeout.
    /// A write the transport cannot complete is a connection error, one that
    /// does not finish in time is [`SolstisError::Timeout`]. Nothing is
    /// retried.
    pub async fn send(
        &mut self,
        op: &str,
        parameters: Option<Value>,
        transmission_id: u32,
    ) -> SolstisResult<()> {
        self.ensure_open()?;
        let envelope = Envelope::request(op, parameters, transmission_id)?;
        let encoded = envelope.encode()?;

        if let Some(stale) = self.pending.take() {
            log::warn!(
                "Sending '{}' while '{}' (id {}) never received its reply",
                op,
                stale.op,
                stale.transmission_id
            );
        }

        log::debug!("-> {}", String::from_utf8_lossy(&encoded));
        self.transport.set_timeout(Some(self.read_timeout)).await?;
        let written = match self.transport.write_all(&encoded).await {
            Ok(()) => self.transport.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if e.is_timeout() {
                self.statistics.increment_timeouts();
            }
            return Err(e);
        }
        self.statistics.increment_messages_sent();
        self.pending = Some(PendingRequest {
            op: op.to_string(),
            transmission_id,
        });
        Ok(())
    }

    /// Receive the next complete message, whatever it is
    ///
    /// Residual bytes from earlier reads are consumed first. Fails with
    /// [`SolstisError::Timeout`] if no complete message arrives within
    /// `timeout` (the configured read timeout when `None`). A partly
    /// scanned message is kept, so a later call resumes where this one
    /// stopped.
    pub async fn receive(&mut self, timeout: Option<Duration>) -> SolstisResult<Envelope> {
        self.ensure_open()?;
        let deadline = Instant::now() + timeout.unwrap_or(self.read_timeout);
        let mut buf = [0u8; READ_CHUNK_SIZE];

        loop {
            match self.extractor.next_document() {
                Ok(Some(document)) => {
                    let envelope = Envelope::decode(document).inspect_err(|_| {
                        self.statistics.increment_framing_errors();
                    })?;
                    self.statistics.increment_messages_received();
                    if envelope.is_unsolicited() {
                        self.statistics.increment_unsolicited();
                    }
                    log::debug!("<- {} (id {:?})", envelope.op, envelope.transmission_id);
                    return Ok(envelope);
                }
                Ok(None) => {}
                Err(e) => {
                    self.statistics.increment_framing_errors();
                    return Err(e);
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.statistics.increment_timeouts();
                return Err(SolstisError::Timeout);
            }
            self.transport.set_timeout(Some(remaining)).await?;
            let n = match self.transport.read(&mut buf).await {
                Ok(n) => n,
                Err(SolstisError::Timeout) => {
                    self.statistics.increment_timeouts();
                    return Err(SolstisError::Timeout);
                }
                Err(e) => return Err(e),
            };
            if n == 0 {
                self.closed = true;
                return Err(SolstisError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Controller closed the connection",
                )));
            }
            self.extractor.feed(&buf[..n]);
        }
    }

    /// Send a request and wait for its `<op>_reply`
    pub async fn send_and_receive(
        &mut self,
        op: &str,
        parameters: Option<Value>,
        transmission_id: u32,
    ) -> SolstisResult<Envelope> {
        let expected = Envelope::reply_op(op);
        self.send_and_receive_expecting(op, parameters, transmission_id, &expected)
            .await
    }

    /// Send a request and wait for a reply with a command-specific op
    pub async fn send_and_receive_expecting(
        &mut self,
        op: &str,
        parameters: Option<Value>,
        transmission_id: u32,
        expected_op: &str,
    ) -> SolstisResult<Envelope> {
        self.send(op, parameters, transmission_id).await?;
        let result = self
            .receive_reply(expected_op, Some(transmission_id), None)
            .await;
        // a reply that arrived but failed verification still answered the request
        if matches!(
            result,
            Ok(_) | Err(SolstisError::Correlation(_) | SolstisError::DeviceProtocol(_))
        ) {
            self.pending = None;
        }
        result
    }

    /// Wait for a correlated message with the given op
    ///
    /// `automatic_output` pushes arriving in the meantime are queued. A
    /// `parse_fail` reply always fails with [`SolstisError::DeviceProtocol`].
    /// The transmission ID is checked only when `transmission_id` is given;
    /// final reports such as `set_wave_m_f_r` are not correlated by ID.
    pub async fn receive_reply(
        &mut self,
        expected_op: &str,
        transmission_id: Option<u32>,
        timeout: Option<Duration>,
    ) -> SolstisResult<Envelope> {
        let deadline = Instant::now() + timeout.unwrap_or(self.read_timeout);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let envelope = self.receive(Some(remaining)).await?;

            if envelope.is_unsolicited() && expected_op != AUTOMATIC_OUTPUT_OP {
                log::trace!("Queued automatic_output while awaiting '{}'", expected_op);
                self.unsolicited.push_back(envelope);
                continue;
            }
            self.verify(&envelope, expected_op, transmission_id)?;
            return Ok(envelope);
        }
    }

    /// Next unsolicited `automatic_output` push
    ///
    /// Queued pushes are returned first. A correlated reply arriving here
    /// answers nothing outstanding and fails with
    /// [`SolstisError::Correlation`].
    pub async fn receive_unsolicited(&mut self, timeout: Option<Duration>) -> SolstisResult<Envelope> {
        if let Some(queued) = self.unsolicited.pop_front() {
            return Ok(queued);
        }
        let envelope = self.receive(timeout).await?;
        if envelope.is_unsolicited() {
            return Ok(envelope);
        }
        if envelope.is_parse_fail() {
            self.statistics.increment_parse_failures();
            return Err(SolstisError::DeviceProtocol(format!(
                "Message with ID {:?} failed to parse",
                envelope.transmission_id
            )));
        }
        self.statistics.increment_correlation_errors();
        Err(SolstisError::Correlation(format!(
            "Expected '{}', but received '{}' (id {:?}) with no request outstanding",
            AUTOMATIC_OUTPUT_OP, envelope.op, envelope.transmission_id
        )))
    }

    fn verify(
        &mut self,
        envelope: &Envelope,
        expected_op: &str,
        transmission_id: Option<u32>,
    ) -> SolstisResult<()> {
        if envelope.is_parse_fail() {
            self.statistics.increment_parse_failures();
            return Err(SolstisError::DeviceProtocol(format!(
                "Message with ID {:?} failed to parse",
                envelope.transmission_id
            )));
        }
        if envelope.op != expected_op {
            self.statistics.increment_correlation_errors();
            return Err(SolstisError::Correlation(format!(
                "Message with ID {:?} has op '{}', expected '{}'",
                envelope.transmission_id, envelope.op, expected_op
            )));
        }
        if let Some(expected_id) = transmission_id {
            if envelope.transmission_id != Some(expected_id) {
                self.statistics.increment_correlation_errors();
                return Err(SolstisError::Correlation(format!(
                    "Message with ID {:?} did not match expected ID {}",
                    envelope.transmission_id, expected_id
                )));
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> SolstisResult<()> {
        if self.is_closed() {
            return Err(SolstisError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Session is closed",
            )));
        }
        Ok(())
    }

    /// Request still awaiting its reply, if any
    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    /// Number of queued unsolicited pushes
    pub fn queued_unsolicited(&self) -> usize {
        self.unsolicited.len()
    }

    /// Drop queued unsolicited pushes
    pub fn clear_unsolicited(&mut self) {
        self.unsolicited.clear();
    }

    /// Bytes received but not yet consumed into a message
    pub fn residual(&self) -> &[u8] {
        self.extractor.residual()
    }

    /// Configured read timeout
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Change the read timeout for subsequent receives
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    pub fn statistics(&self) -> &SessionStatistics {
        &self.statistics
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Check if session is closed
    pub fn is_closed(&self) -> bool {
        self.closed || self.transport.is_closed()
    }

    /// Close the session, discarding residual bytes and queued pushes
    pub async fn close(&mut self) -> SolstisResult<()> {
        if !self.closed {
            self.transport.close().await?;
            self.closed = true;
        }
        self.extractor.reset();
        self.unsolicited.clear();
        self.pending = None;
        Ok(())
    }
}
