//! Link setup

use crate::catalog::descriptor::START_LINK;
use crate::client::SolstisClient;
use serde_json::json;
use solstis_core::{SolstisError, SolstisResult};
use solstis_transport::TransportLayer;
use std::net::IpAddr;

impl<T: TransportLayer> SolstisClient<T> {
    /// Form the link the controller requires before any other command
    ///
    /// `ip_address` is the address the controller knows this client by.
    pub async fn start_link(&mut self, ip_address: &str) -> SolstisResult<()> {
        ip_address.parse::<IpAddr>().map_err(|e| {
            SolstisError::Validation(format!("Invalid link IP address '{}': {}", ip_address, e))
        })?;
        self.execute(&START_LINK, Some(json!({ "ip_address": ip_address })))
            .await?;
        log::info!("Link established as {}", ip_address);
        Ok(())
    }
}
