//! Client configuration
//!
//! Settings are layered with figment: built-in defaults, then an optional
//! TOML file, then `SOLSTIS_` environment variables.
//!
//! ```toml
//! address = "192.168.1.222"
//! port = 39933
//! read_timeout_ms = 10000
//! link_ip = "192.168.1.107"
//! ```
//!
//! `SOLSTIS_PORT=40000` overrides `port`, and so on for every field.

use crate::client::validate_transmission_id;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use solstis_core::{DEFAULT_PORT, MIN_TRANSMISSION_ID, SolstisError, SolstisResult};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "SOLSTIS_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Controller host name or IP address
    pub address: String,
    pub port: u16,
    pub read_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Address this client announces in `start_link`
    pub link_ip: String,
    pub first_transmission_id: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: "192.168.1.222".to_string(),
            port: DEFAULT_PORT,
            read_timeout_ms: 10_000,
            connect_timeout_ms: 30_000,
            link_ip: "192.168.1.107".to_string(),
            first_transmission_id: MIN_TRANSMISSION_ID,
        }
    }
}

impl ClientConfig {
    /// Figment layering defaults, the optional file and the environment
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(ClientConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load and validate the configuration
    ///
    /// A missing file is not an error; defaults and environment apply.
    pub fn load(path: Option<&Path>) -> SolstisResult<Self> {
        if let Some(path) = path {
            if !path.exists() {
                log::warn!("Config file {} not found, using defaults", path.display());
            }
        }
        let config: ClientConfig = Self::figment(path)
            .extract()
            .map_err(|e| SolstisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SolstisResult<()> {
        if self.address.trim().is_empty() {
            return Err(SolstisError::Config("address must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(SolstisError::Config("port must not be 0".to_string()));
        }
        if self.read_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err(SolstisError::Config("timeouts must be positive".to_string()));
        }
        self.link_ip.parse::<IpAddr>().map_err(|e| {
            SolstisError::Config(format!("link_ip '{}' is not an IP address: {}", self.link_ip, e))
        })?;
        validate_transmission_id(self.first_transmission_id)
            .map_err(|e| SolstisError::Config(e.to_string()))
    }

    /// `host:port` of the controller
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.port, 39933);
        assert_eq!(config.endpoint(), "192.168.1.222:39933");
        assert_eq!(config.read_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "solstis.toml",
                r#"
                address = "10.0.0.5"
                read_timeout_ms = 2500
                "#,
            )?;
            jail.set_env("SOLSTIS_PORT", "40000");

            let config = ClientConfig::load(Some(Path::new("solstis.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.address, "10.0.0.5");
            assert_eq!(config.port, 40000);
            assert_eq!(config.read_timeout_ms, 2500);
            assert_eq!(config.link_ip, "192.168.1.107");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_| {
            let config = ClientConfig::load(Some(Path::new("absent.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config, ClientConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_serialized_config_reloads() {
        Jail::expect_with(|jail| {
            let config = ClientConfig {
                first_transmission_id: 200,
                ..ClientConfig::default()
            };
            let text = toml::to_string(&config).map_err(|e| e.to_string())?;
            jail.create_file("saved.toml", &text)?;
            let loaded = ClientConfig::load(Some(Path::new("saved.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(loaded, config);
            Ok(())
        });
    }

    #[test]
    fn test_validation() {
        let invalid = [
            ClientConfig { port: 0, ..ClientConfig::default() },
            ClientConfig { read_timeout_ms: 0, ..ClientConfig::default() },
            ClientConfig { first_transmission_id: 0, ..ClientConfig::default() },
            ClientConfig { first_transmission_id: 16384, ..ClientConfig::default() },
            ClientConfig { link_ip: "laser".to_string(), ..ClientConfig::default() },
        ];
        for config in invalid {
            assert!(
                matches!(config.validate(), Err(SolstisError::Config(_))),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn test_env_type_error_is_config_error() {
        Jail::expect_with(|jail| {
            jail.set_env("SOLSTIS_PORT", "not-a-port");
            assert!(matches!(
                ClientConfig::load(None),
                Err(SolstisError::Config(_))
            ));
            Ok(())
        });
    }
}
