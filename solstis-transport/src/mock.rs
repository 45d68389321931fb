//! Scripted in-memory transport
//!
//! Inbound bytes are delivered one queued chunk per `read`, which lets tests
//! place chunk boundaries anywhere in a message. An optional responder turns
//! each outbound write into further inbound chunks, standing in for the
//! controller. When the queue is empty a read reports [`SolstisError::Timeout`],
//! mirroring a controller that stays silent past the deadline.

use crate::error::{SolstisError, SolstisResult};
use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send + Sync>;

/// Shared record of every buffer written to a [`MockTransport`]
#[derive(Debug, Clone, Default)]
pub struct WriteLog(Arc<Mutex<Vec<Vec<u8>>>>);

impl WriteLog {
    fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All writes so far, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().clone()
    }

    /// All writes decoded as UTF-8 (lossy)
    pub fn writes_as_strings(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Number of writes so far
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check whether nothing was written
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// In-memory transport driven by a script of inbound chunks
pub struct MockTransport {
    inbound: VecDeque<Vec<u8>>,
    responder: Option<Responder>,
    log: WriteLog,
    timeout: Option<Duration>,
    closed: bool,
    eof_when_drained: bool,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("pending_chunks", &self.inbound.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create an open mock transport with nothing queued
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            responder: None,
            log: WriteLog::default(),
            timeout: None,
            closed: false,
            eof_when_drained: false,
        }
    }

    /// Create a mock transport that will deliver `chunks` one per read
    pub fn with_chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        let mut transport = Self::new();
        for chunk in chunks {
            transport.push_chunk(chunk);
        }
        transport
    }

    /// Install a closure that answers each write with inbound chunks
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Report EOF instead of a timeout once the script is exhausted
    pub fn eof_when_drained(mut self) -> Self {
        self.eof_when_drained = true;
        self
    }

    /// Queue another inbound chunk
    pub fn push_chunk(&mut self, chunk: impl Into<Vec<u8>>) {
        let chunk = chunk.into();
        if !chunk.is_empty() {
            self.inbound.push_back(chunk);
        }
    }

    /// Handle onto the write record, usable after the transport is moved
    pub fn write_log(&self) -> WriteLog {
        self.log.clone()
    }

    /// Read timeout last requested by the caller
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl TransportLayer for MockTransport {
    async fn open(&mut self) -> SolstisResult<()> {
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for MockTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> SolstisResult<()> {
        self.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> SolstisResult<usize> {
        if self.closed {
            return Err(SolstisError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Mock transport is closed",
            )));
        }
        let Some(mut chunk) = self.inbound.pop_front() else {
            if self.eof_when_drained {
                self.closed = true;
                return Ok(0);
            }
            return Err(SolstisError::Timeout);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.inbound.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> SolstisResult<usize> {
        if self.closed {
            return Err(SolstisError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Mock transport is closed",
            )));
        }
        self.log.lock().push(buf.to_vec());
        if let Some(responder) = self.responder.as_mut() {
            for chunk in responder(buf) {
                if !chunk.is_empty() {
                    self.inbound.push_back(chunk);
                }
            }
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> SolstisResult<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> SolstisResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunks_delivered_in_order() {
        let mut transport = MockTransport::with_chunks(["ab", "cde"]);
        let mut buf = [0u8; 16];
        assert_eq!(transport.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"ab");
        assert_eq!(transport.read(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf[..3], b"cde");
        assert!(transport.read(&mut buf).await.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_oversized_chunk_is_split() {
        let mut transport = MockTransport::with_chunks(["abcdef"]);
        let mut buf = [0u8; 4];
        assert_eq!(transport.read(&mut buf).await.unwrap(), 4);
        assert_eq!(transport.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
    }

    #[tokio::test]
    async fn test_responder_and_write_log() {
        let mut transport =
            MockTransport::new().with_responder(|written| vec![written.to_ascii_uppercase()]);
        let log = transport.write_log();
        transport.write_all(b"ping").await.unwrap();

        let mut buf = [0u8; 8];
        let n = transport.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"PING");
        assert_eq!(log.writes_as_strings(), vec!["ping".to_string()]);
    }

    #[tokio::test]
    async fn test_eof_when_drained() {
        let mut transport = MockTransport::new().eof_when_drained();
        let mut buf = [0u8; 4];
        assert_eq!(transport.read(&mut buf).await.unwrap(), 0);
        assert!(transport.is_closed());
    }
}
