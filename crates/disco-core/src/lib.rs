//! # disco-core
//!
//! Configuration shared by the disco transport and discovery crates.
//!
//! - **Transport settings**: datagram size limit, channel capacity,
//!   multicast TTL, loopback and interface selection.
//! - **Discovery settings**: the shared multicast group and the query
//!   timeout.
//! - **Loading**: YAML files, or the `config` crate with `DISCO__*`
//!   environment overrides.

pub mod config;
pub mod error;

pub use config::{
    DiscoConfig, DiscoveryConfig, TransportConfig, DEFAULT_GROUP_ADDR, DEFAULT_MAX_DATAGRAM_SIZE,
};
pub use error::{ConfigError, Result};
