//! SolsTiS client
//!
//! [`SolstisClient`] owns one [`Session`] and the transmission-ID counter.
//! The typed commands live in [`crate::catalog`] as further `impl` blocks
//! on this type.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use solstis_client::ClientBuilder;
//!
//! # async fn run() -> solstis_client::SolstisResult<()> {
//! let mut client = ClientBuilder::new()
//!     .tcp("192.168.1.222:39933")
//!     .link_ip("192.168.1.107")
//!     .connect_and_link()
//!     .await?;
//!
//! let status = client.get_status().await?;
//! println!("{} nm", status.wavelength);
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::catalog::descriptor::CommandDescriptor;
use solstis_core::{MAX_TRANSMISSION_ID, MIN_TRANSMISSION_ID, SolstisError, SolstisResult};
use solstis_session::{Envelope, Session};
use solstis_transport::TransportLayer;
use serde_json::Value;
use std::time::Duration;

/// Typed client for one SolsTiS controller connection
///
/// Every operation takes `&mut self`, so at most one request is ever
/// outstanding on the connection. Callers needing concurrent access must
/// serialize through a single owner or open another connection.
#[derive(Debug)]
pub struct SolstisClient<T: TransportLayer> {
    session: Session<T>,
    next_id: u32,
}

impl<T: TransportLayer> SolstisClient<T> {
    /// Wrap an existing session
    ///
    /// # Errors
    /// Returns [`SolstisError::Validation`] if `first_transmission_id` is
    /// outside the range the controller accepts.
    pub fn new(session: Session<T>, first_transmission_id: u32) -> SolstisResult<Self> {
        validate_transmission_id(first_transmission_id)?;
        Ok(Self {
            session,
            next_id: first_transmission_id,
        })
    }

    /// Take the next transmission ID, wrapping back to the minimum after the maximum
    pub fn next_transmission_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = if id >= MAX_TRANSMISSION_ID {
            MIN_TRANSMISSION_ID
        } else {
            id + 1
        };
        id
    }

    /// Run one catalog command and decode its status
    ///
    /// Returns the success code and the full reply so the caller can read
    /// command-specific fields.
    pub(crate) async fn execute(
        &mut self,
        descriptor: &CommandDescriptor,
        parameters: Option<Value>,
    ) -> SolstisResult<(i64, Envelope)> {
        let id = self.next_transmission_id();
        let reply = self
            .session
            .send_and_receive_expecting(descriptor.op, parameters, id, descriptor.reply_op)
            .await?;
        let code = descriptor.decode(&reply)?;
        Ok((code, reply))
    }

    /// Wait for the uncorrelated final report that follows `report: finished`
    pub(crate) async fn await_final_report(
        &mut self,
        descriptor: &CommandDescriptor,
        timeout: Option<Duration>,
    ) -> SolstisResult<(i64, Envelope)> {
        let report = self
            .session
            .receive_reply(descriptor.reply_op, None, timeout)
            .await?;
        let code = descriptor.decode(&report)?;
        Ok((code, report))
    }

    /// Next unsolicited `automatic_output` push
    pub async fn next_push(&mut self, timeout: Option<Duration>) -> SolstisResult<Envelope> {
        self.session.receive_unsolicited(timeout).await
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    /// Direct access to the session for raw protocol work
    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// Close the connection
    ///
    /// Any later command fails with a connection error.
    pub async fn close(&mut self) -> SolstisResult<()> {
        log::info!("Closing SolsTiS connection");
        self.session.close().await
    }
}

pub(crate) fn validate_transmission_id(id: u32) -> SolstisResult<()> {
    if (MIN_TRANSMISSION_ID..=MAX_TRANSMISSION_ID).contains(&id) {
        Ok(())
    } else {
        Err(SolstisError::Validation(format!(
            "Transmission ID must be in {}..={}, got {}",
            MIN_TRANSMISSION_ID, MAX_TRANSMISSION_ID, id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solstis_transport::MockTransport;

    fn client(first_id: u32) -> SolstisClient<MockTransport> {
        let session = Session::from_open(MockTransport::new(), Duration::from_millis(50));
        SolstisClient::new(session, first_id).unwrap()
    }

    #[test]
    fn test_transmission_id_wraps() {
        let mut client = client(MAX_TRANSMISSION_ID - 1);
        assert_eq!(client.next_transmission_id(), MAX_TRANSMISSION_ID - 1);
        assert_eq!(client.next_transmission_id(), MAX_TRANSMISSION_ID);
        assert_eq!(client.next_transmission_id(), MIN_TRANSMISSION_ID);
        assert_eq!(client.next_transmission_id(), 2);
    }

    #[test]
    fn test_rejects_out_of_range_first_id() {
        let session = Session::from_open(MockTransport::new(), Duration::from_millis(50));
        assert!(matches!(
            SolstisClient::new(session, 0),
            Err(SolstisError::Validation(_))
        ));
        let session = Session::from_open(MockTransport::new(), Duration::from_millis(50));
        assert!(SolstisClient::new(session, MAX_TRANSMISSION_ID + 1).is_err());
    }

    #[tokio::test]
    async fn test_close_rejects_further_commands() {
        let mut client = client(1);
        client.close().await.unwrap();
        assert!(client.is_closed());
        assert!(matches!(
            client.get_status().await,
            Err(SolstisError::Connection(_))
        ));
    }
}
