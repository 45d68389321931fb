//! Client builder
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use solstis_client::ClientBuilder;
//! use std::time::Duration;
//!
//! # async fn run() -> solstis_client::SolstisResult<()> {
//! let mut client = ClientBuilder::new()
//!     .tcp("192.168.1.222")
//!     .read_timeout(Duration::from_secs(5))
//!     .link_ip("192.168.1.107")
//!     .connect_and_link()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::client::{validate_transmission_id, SolstisClient};
use crate::config::ClientConfig;
use solstis_core::{DEFAULT_PORT, MIN_TRANSMISSION_ID, SolstisError, SolstisResult};
use solstis_session::{Session, DEFAULT_READ_TIMEOUT};
use solstis_transport::{TcpSettings, TcpTransport, TransportLayer};
use std::time::Duration;

/// Builder for [`SolstisClient`]
///
/// Defaults match [`ClientConfig::default`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    /// Controller address, `host` or `host:port`
    address: Option<String>,
    read_timeout: Duration,
    connect_timeout: Duration,
    /// Address announced in `start_link`
    link_ip: Option<String>,
    first_transmission_id: u32,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            address: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: Duration::from_secs(30),
            link_ip: None,
            first_transmission_id: MIN_TRANSMISSION_ID,
        }
    }

    /// Start from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new()
            .tcp(&config.endpoint())
            .read_timeout(config.read_timeout())
            .connect_timeout(config.connect_timeout())
            .link_ip(&config.link_ip)
            .first_transmission_id(config.first_transmission_id)
    }

    /// Controller address as `host:port`, or `host` for the default port
    pub fn tcp(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Deadline for each reply
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Address announced to the controller by [`ClientBuilder::connect_and_link`]
    pub fn link_ip(mut self, ip: &str) -> Self {
        self.link_ip = Some(ip.to_string());
        self
    }

    pub fn first_transmission_id(mut self, id: u32) -> Self {
        self.first_transmission_id = id;
        self
    }

    /// Open a TCP connection to the controller
    ///
    /// # Errors
    /// Returns error if:
    /// - No address is configured or it cannot be resolved
    /// - The connection is not established within the connect timeout
    pub async fn connect(&self) -> SolstisResult<SolstisClient<TcpTransport>> {
        validate_transmission_id(self.first_transmission_id)?;
        let address = self.resolve().await?;
        let mut settings = TcpSettings::with_timeout(address, self.read_timeout);
        settings.connect_timeout = Some(self.connect_timeout);

        let mut transport = TcpTransport::new(settings);
        transport.open().await?;
        let session = Session::from_open(transport, self.read_timeout);
        SolstisClient::new(session, self.first_transmission_id)
    }

    /// Connect and form the link with `start_link`
    pub async fn connect_and_link(&self) -> SolstisResult<SolstisClient<TcpTransport>> {
        let link_ip = self
            .link_ip
            .as_deref()
            .ok_or_else(|| SolstisError::Validation("Link IP address is not configured".to_string()))?;
        let mut client = self.connect().await?;
        client.start_link(link_ip).await?;
        Ok(client)
    }

    /// Build a client over an already-open transport
    pub fn build_with_transport<T: TransportLayer>(&self, transport: T) -> SolstisResult<SolstisClient<T>> {
        let session = Session::from_open(transport, self.read_timeout);
        SolstisClient::new(session, self.first_transmission_id)
    }

    async fn resolve(&self) -> SolstisResult<std::net::SocketAddr> {
        let address = self
            .address
            .as_deref()
            .ok_or_else(|| SolstisError::Validation("Controller address is not configured".to_string()))?;
        let target = if address.contains(':') {
            address.to_string()
        } else {
            format!("{}:{}", address, DEFAULT_PORT)
        };
        let mut candidates = tokio::net::lookup_host(&target).await?;
        candidates.next().ok_or_else(|| {
            SolstisError::Validation(format!("Address '{}' did not resolve", address))
        })
    }
}
