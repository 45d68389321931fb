//! TCP transport implementation

use crate::error::{SolstisError, SolstisResult};
use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use solstis_core::DEFAULT_PORT;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Wrapper for TcpStream that implements Debug
struct DebugTcpStream(TcpStream);

impl fmt::Debug for DebugTcpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpStream").finish()
    }
}

impl Deref for DebugTcpStream {
    type Target = TcpStream;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugTcpStream {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub address: SocketAddr,
    /// Deadline for establishing the connection
    pub connect_timeout: Option<Duration>,
    /// Deadline applied to each read and write
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create new TCP settings
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            connect_timeout: Some(Duration::from_secs(30)),
            timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Create TCP settings for a controller on the default port
    pub fn for_host(host: IpAddr) -> Self {
        Self::new(SocketAddr::new(host, DEFAULT_PORT))
    }

    /// Create TCP settings with an I/O timeout
    pub fn with_timeout(address: SocketAddr, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::new(address)
        }
    }
}

/// TCP transport layer implementation
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<DebugTcpStream>,
    settings: TcpSettings,
    closed: bool,
}

impl TcpTransport {
    /// Create a new TCP transport layer
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Create TCP transport from address string
    ///
    /// A bare IP address without port uses the controller's default port.
    pub fn from_address(address: &str) -> SolstisResult<Self> {
        if let Ok(addr) = address.parse::<SocketAddr>() {
            return Ok(Self::new(TcpSettings::new(addr)));
        }
        let host: IpAddr = address
            .parse()
            .map_err(|e| SolstisError::Validation(format!("Invalid TCP address: {}", e)))?;
        Ok(Self::new(TcpSettings::for_host(host)))
    }

    /// Remote address of this transport
    pub fn address(&self) -> SocketAddr {
        self.settings.address
    }

    fn stream_mut(&mut self) -> SolstisResult<&mut DebugTcpStream> {
        self.stream.as_mut().ok_or_else(|| {
            SolstisError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "TCP stream not connected",
            ))
        })
    }
}

#[async_trait]
impl TransportLayer for TcpTransport {
    async fn open(&mut self) -> SolstisResult<()> {
        if !self.closed {
            return Err(SolstisError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let stream = if let Some(timeout) = self.settings.connect_timeout {
            tokio::time::timeout(timeout, TcpStream::connect(self.settings.address))
                .await
                .map_err(|_| SolstisError::Timeout)??
        } else {
            TcpStream::connect(self.settings.address).await?
        };
        stream.set_nodelay(true)?;

        log::info!("Connected to SolsTiS controller at {}", self.settings.address);
        self.stream = Some(DebugTcpStream(stream));
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for TcpTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> SolstisResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> SolstisResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        let result = if let Some(timeout) = timeout {
            match tokio::time::timeout(timeout, stream.read(buf)).await {
                Ok(r) => r.map_err(SolstisError::Connection),
                // read() is cancel-safe, so the stream itself is still usable
                Err(_) => return Err(SolstisError::Timeout),
            }
        } else {
            stream.read(buf).await.map_err(SolstisError::Connection)
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> SolstisResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.write(buf))
                .await
                .map_err(|_| SolstisError::Timeout)?
                .map_err(SolstisError::Connection)
        } else {
            stream.write(buf).await.map_err(SolstisError::Connection)
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> SolstisResult<()> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        let result = if let Some(timeout) = timeout {
            match tokio::time::timeout(timeout, stream.write_all(buf)).await {
                Ok(r) => r.map_err(SolstisError::Connection),
                Err(_) => Err(SolstisError::Timeout),
            }
        } else {
            stream.write_all(buf).await.map_err(SolstisError::Connection)
        };
        if let Err(SolstisError::Connection(_)) = &result {
            self.closed = true;
        }
        result
    }

    async fn flush(&mut self) -> SolstisResult<()> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.flush())
                .await
                .map_err(|_| SolstisError::Timeout)?
                .map_err(SolstisError::Connection)
        } else {
            stream.flush().await.map_err(SolstisError::Connection)
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> SolstisResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_settings() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let settings = TcpSettings::new(addr);
        assert_eq!(settings.address, addr);
        assert!(settings.timeout.is_some());
    }

    #[test]
    fn test_from_address_default_port() {
        let transport = TcpTransport::from_address("192.168.1.222").unwrap();
        assert_eq!(transport.address().port(), DEFAULT_PORT);

        let transport = TcpTransport::from_address("10.0.0.5:4000").unwrap();
        assert_eq!(transport.address().port(), 4000);

        assert!(TcpTransport::from_address("not an address").is_err());
    }

    #[tokio::test]
    async fn test_loopback_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf).await.unwrap();
        });

        let mut transport = TcpTransport::new(TcpSettings::new(addr));
        transport.open().await.unwrap();
        assert!(!transport.is_closed());
        transport.write_all(b"hello").await.unwrap();

        let mut buf = [0u8; 5];
        let mut pos = 0;
        while pos < buf.len() {
            pos += transport.read(&mut buf[pos..]).await.unwrap();
        }
        assert_eq!(&buf, b"hello");

        server.await.unwrap();
        transport.close().await.unwrap();
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_write_timeout_when_peer_stops_reading() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let mut transport =
            TcpTransport::new(TcpSettings::with_timeout(addr, Duration::from_millis(100)));
        transport.open().await.unwrap();
        // larger than both socket buffers
        let payload = vec![b'x'; 64 * 1024 * 1024];
        let result = tokio::time::timeout(Duration::from_secs(5), transport.write_all(&payload))
            .await
            .expect("write_all ignored its deadline");
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut transport =
            TcpTransport::new(TcpSettings::with_timeout(addr, Duration::from_millis(50)));
        transport.open().await.unwrap();
        let mut buf = [0u8; 8];
        let err = transport.read(&mut buf).await.unwrap_err();
        assert!(err.is_timeout());
    }
}
