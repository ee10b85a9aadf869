//! Multicast service discovery
//!
//! This crate implements a small discovery protocol over disco's
//! multicast transport:
//! - Announce a named service and answer queries for it
//! - Wait for a set of named services to announce themselves
//! - Query a group for the owner of a name
//!
//! # Architecture
//!
//! Each announcer, watch and query opens its own subscription on the
//! group; the OS multicast fan-out hands every one of them its own copy
//! of each datagram. There is no shared socket or dispatcher.
//!
//! Messages are `srvc;<kind>;<source address>;<name>` text records, one
//! per datagram. Datagrams that do not decode are ignored, since
//! unrelated traffic may share the group.
//!
//! # Example
//!
//! ```no_run
//! use disco_discovery::{announce, listen_for};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut watch = listen_for("224.0.0.1:9999", ["rlog"]).await?;
//!
//!     let announcer = announce("224.0.0.1:9999", "192.168.0.1:1234", "rlog").await?;
//!
//!     while let Some(name) = watch.recv().await {
//!         println!("{} is up", name?);
//!     }
//!
//!     announcer.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod announcer;
pub mod error;
pub mod message;
pub mod resolver;
pub mod service;
pub mod watch;

pub use announcer::Announcer;
pub use error::{DecodeError, DiscoveryError, Result};
pub use message::{DiscoveryMessage, MessageKind};
pub use service::DiscoveryService;
pub use watch::NameWatch;

use disco_transport::MulticastTransport;
use std::time::Duration;

/// Announce `name` on `group` with the default transport.
pub async fn announce(group: &str, source_address: &str, name: &str) -> Result<Announcer> {
    announcer::announce(&MulticastTransport::default(), group, source_address, name).await
}

/// Watch `group` for `names` with the default transport.
pub async fn listen_for<I, S>(group: &str, names: I) -> Result<NameWatch>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    watch::listen_for(&MulticastTransport::default(), group, names).await
}

/// Query `group` for the owner of `name` with the default transport.
pub async fn query(group: &str, source_address: &str, name: &str, wait: Duration) -> Result<String> {
    resolver::query(&MulticastTransport::default(), group, source_address, name, wait).await
}
