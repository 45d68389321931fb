//! Stream accessor trait for transport layer

use crate::error::{SolstisError, SolstisResult};
use async_trait::async_trait;
use std::time::Duration;

/// Stream accessor interface to access a physical stream to the laser controller
#[async_trait]
pub trait StreamAccessor: Send + Sync {
    /// Set the timeout applied to each read and write
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout duration. None means infinite timeout.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> SolstisResult<()>;

    /// Read data from the stream
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if EOF
    async fn read(&mut self, buf: &mut [u8]) -> SolstisResult<usize>;

    /// Write data to the stream
    ///
    /// # Returns
    ///
    /// Number of bytes written
    async fn write(&mut self, buf: &[u8]) -> SolstisResult<usize>;

    /// Write all data to the stream
    ///
    /// A write the transport cannot complete is reported as a connection
    /// error; nothing is retried.
    async fn write_all(&mut self, buf: &[u8]) -> SolstisResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(SolstisError::Connection(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "Failed to write all data",
                )));
            }
            written += n;
        }
        Ok(())
    }

    /// Flush any buffered data
    async fn flush(&mut self) -> SolstisResult<()>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream
    async fn close(&mut self) -> SolstisResult<()>;
}

/// Transport layer trait that extends StreamAccessor
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the physical layer connection
    async fn open(&mut self) -> SolstisResult<()>;
}
