//! Configuration management
//!
//! Plain defaults with environment-variable overrides. Every knob has a
//! `DROVER_*` variable; invalid values fail configuration loading instead of
//! being silently ignored.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::PoolConfig;
use crate::error::{DroverError, Result};

/// Listener-side configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind; the default accepts connections on any local address
    pub bind_host: String,

    /// Port to bind; 0 requests an OS-assigned port
    pub port: u16,

    /// Shut down after serving exactly one client connection
    pub single_use: bool,

    /// Announcement file target; stdout when unset
    pub announce_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 0,
            single_use: false,
            announce_file: None,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden from `DROVER_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("DROVER_BIND_HOST") {
            config.bind_host = host;
        }
        if let Ok(port) = std::env::var("DROVER_PORT") {
            config.port = port
                .parse()
                .map_err(|e| DroverError::Configuration(format!("Invalid DROVER_PORT: {e}")))?;
        }
        if let Ok(single_use) = std::env::var("DROVER_SINGLE_USE") {
            config.single_use = parse_bool("DROVER_SINGLE_USE", &single_use)?;
        }
        if let Ok(path) = std::env::var("DROVER_ANNOUNCE_FILE") {
            config.announce_file = Some(PathBuf::from(path));
        }

        Ok(config)
    }
}

/// Per-connection client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection establishment timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden from `DROVER_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("DROVER_CONNECT_TIMEOUT_MS") {
            config.connect_timeout_ms = timeout.parse().map_err(|e| {
                DroverError::Configuration(format!("Invalid DROVER_CONNECT_TIMEOUT_MS: {e}"))
            })?;
        }

        Ok(config)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Full configuration bundle
#[derive(Debug, Clone, Default)]
pub struct DroverConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub pool: PoolConfig,
}

impl DroverConfig {
    /// Defaults overridden from `DROVER_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut pool = PoolConfig::default();
        if let Ok(shuffle) = std::env::var("DROVER_SHUFFLE_READY_ORDER") {
            pool.shuffle_ready_order = parse_bool("DROVER_SHUFFLE_READY_ORDER", &shuffle)?;
        }

        Ok(Self {
            server: ServerConfig::from_env()?,
            client: ClientConfig::from_env()?,
            pool,
        })
    }
}

fn parse_bool(variable: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(DroverError::Configuration(format!(
            "Invalid {variable}: expected a boolean, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_host, "0.0.0.0");
        assert_eq!(config.port, 0);
        assert!(!config.single_use);
        assert!(config.announce_file.is_none());

        assert_eq!(ClientConfig::default().connect_timeout_ms, 5000);
    }

    #[test]
    fn test_bool_parsing() {
        assert!(parse_bool("X", "1").unwrap());
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(!parse_bool("X", "no").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("DROVER_PORT", "7700");
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 7700);
        std::env::remove_var("DROVER_PORT");
    }

    #[test]
    fn test_invalid_env_value_fails() {
        std::env::set_var("DROVER_CONNECT_TIMEOUT_MS", "soon");
        assert!(ClientConfig::from_env().is_err());
        std::env::remove_var("DROVER_CONNECT_TIMEOUT_MS");
    }
}
