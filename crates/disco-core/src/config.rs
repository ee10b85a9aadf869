//! Configuration for the multicast transport and the discovery protocol.
//!
//! Settings can be loaded from YAML files, merged with `DISCO__*`
//! environment variables through the `config` crate, and validated
//! before use.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default multicast group used by discovery.
pub const DEFAULT_GROUP_ADDR: &str = "224.0.0.1:9999";

/// Default upper bound for a single datagram, in bytes.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 8192;

/// Root configuration.
///
/// # Examples
///
/// ```
/// use disco_core::DiscoConfig;
///
/// let config = DiscoConfig::from_yaml("discovery:\n  group_addr: \"239.1.2.3:7000\"\n").unwrap();
/// assert_eq!(config.discovery.group_addr, "239.1.2.3:7000");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoConfig {
    /// Socket-level settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Protocol-level settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl DiscoConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::InvalidFormat {
            reason: e.to_string(),
        })
    }

    /// Loads configuration using the `config` crate.
    ///
    /// The file is optional; values are overridden by environment
    /// variables such as `DISCO__DISCOVERY__GROUP_ADDR`.
    pub fn from_config_builder<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("DISCO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| ConfigError::InvalidFormat {
                reason: e.to_string(),
            })?;

        debug!(path = %path.display(), group = %loaded.discovery.group_addr, "Configuration loaded");
        Ok(loaded)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.transport.validate()?;
        self.discovery.validate()
    }
}

/// Settings for multicast sockets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Largest datagram accepted on send or receive
    #[serde(default = "default_max_datagram_size")]
    pub max_datagram_size: usize,

    /// Datagrams buffered between a receive loop and its consumer
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Multicast TTL for outgoing datagrams
    #[serde(default = "default_multicast_ttl")]
    pub multicast_ttl: u32,

    /// Deliver our own datagrams back to local subscribers
    #[serde(default = "default_multicast_loop")]
    pub multicast_loop: bool,

    /// IPv4 interface used to join groups (unspecified = OS choice)
    #[serde(default)]
    pub interface_v4: Option<Ipv4Addr>,

    /// IPv6 interface index used to join groups (0 = OS choice)
    #[serde(default)]
    pub interface_v6: u32,

    /// Socket receive buffer size (None = OS default)
    #[serde(default)]
    pub recv_buffer_size: Option<usize>,
}

fn default_max_datagram_size() -> usize {
    DEFAULT_MAX_DATAGRAM_SIZE
}

fn default_channel_capacity() -> usize {
    1
}

fn default_multicast_ttl() -> u32 {
    1
}

fn default_multicast_loop() -> bool {
    true
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_datagram_size: default_max_datagram_size(),
            channel_capacity: default_channel_capacity(),
            multicast_ttl: default_multicast_ttl(),
            multicast_loop: default_multicast_loop(),
            interface_v4: None,
            interface_v6: 0,
            recv_buffer_size: None,
        }
    }
}

impl TransportConfig {
    /// IPv4 interface to join on, falling back to the unspecified address.
    pub fn interface_v4(&self) -> Ipv4Addr {
        self.interface_v4.unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    /// Validates the transport settings.
    pub fn validate(&self) -> Result<()> {
        // Largest UDP payload over IPv4
        if self.max_datagram_size == 0 || self.max_datagram_size > 65_507 {
            return Err(ConfigError::invalid_value(
                "transport.max_datagram_size",
                "must be between 1 and 65507",
            ));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "transport.channel_capacity",
                "cannot be 0",
            ));
        }

        if self.multicast_ttl > 255 {
            return Err(ConfigError::invalid_value(
                "transport.multicast_ttl",
                "cannot exceed 255",
            ));
        }

        Ok(())
    }
}

/// Settings for the discovery protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Multicast group shared by announcers and listeners
    #[serde(default = "default_group_addr")]
    pub group_addr: String,

    /// How long a query waits for a response (milliseconds)
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,
}

fn default_group_addr() -> String {
    DEFAULT_GROUP_ADDR.to_string()
}

fn default_query_timeout() -> u64 {
    2000
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            group_addr: default_group_addr(),
            query_timeout_ms: default_query_timeout(),
        }
    }
}

impl DiscoveryConfig {
    /// Returns the query timeout as a Duration
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Validates the discovery settings.
    ///
    /// Only literal `ip:port` groups are checked here; host names are
    /// left to resolution at socket setup.
    pub fn validate(&self) -> Result<()> {
        if self.group_addr.is_empty() {
            return Err(ConfigError::invalid_value(
                "discovery.group_addr",
                "cannot be empty",
            ));
        }

        if let Ok(addr) = self.group_addr.parse::<SocketAddr>() {
            if !addr.ip().is_multicast() {
                return Err(ConfigError::invalid_value(
                    "discovery.group_addr",
                    format!("{} is not a multicast address", addr.ip()),
                ));
            }
        }

        if self.query_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "discovery.query_timeout_ms",
                "cannot be 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoConfig::default();
        assert_eq!(config.discovery.group_addr, DEFAULT_GROUP_ADDR);
        assert_eq!(config.transport.max_datagram_size, 8192);
        assert_eq!(config.transport.channel_capacity, 1);
        assert_eq!(config.transport.interface_v4(), Ipv4Addr::UNSPECIFIED);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
transport:
  max_datagram_size: 1024
  multicast_ttl: 4
  interface_v4: 192.168.1.10

discovery:
  group_addr: "239.255.0.1:5000"
  query_timeout_ms: 500
"#;

        let config = DiscoConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.transport.max_datagram_size, 1024);
        assert_eq!(config.transport.multicast_ttl, 4);
        assert_eq!(
            config.transport.interface_v4(),
            Ipv4Addr::new(192, 168, 1, 10)
        );
        assert!(config.transport.multicast_loop);
        assert_eq!(config.discovery.group_addr, "239.255.0.1:5000");
        assert_eq!(config.discovery.query_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_yaml() {
        let result = DiscoConfig::from_yaml("transport: [not, a, map]");
        assert!(matches!(result, Err(ConfigError::InvalidFormat { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = DiscoConfig::from_file("/nonexistent/disco.yaml");
        assert!(matches!(result, Err(ConfigError::LoadFailed { .. })));
    }

    #[test]
    fn test_validation_rejects_zero_sizes() {
        let mut config = DiscoConfig::default();
        config.transport.max_datagram_size = 0;
        assert!(config.validate().is_err());

        let mut config = DiscoConfig::default();
        config.transport.channel_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = DiscoConfig::default();
        config.discovery.query_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unicast_group() {
        let mut config = DiscoConfig::default();
        config.discovery.group_addr = "192.168.0.1:9999".to_string();

        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "discovery.group_addr")
            }
            other => panic!("expected invalid group address, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_accepts_hostname_group() {
        let mut config = DiscoConfig::default();
        config.discovery.group_addr = "localhost:9999".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder_without_file() {
        let config = DiscoConfig::from_config_builder("/nonexistent/disco.yaml").unwrap();
        assert_eq!(config.transport.max_datagram_size, DEFAULT_MAX_DATAGRAM_SIZE);
    }
}
