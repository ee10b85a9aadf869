//! Discovery bound to a configured group and transport

use crate::announcer::{self, Announcer};
use crate::error::Result;
use crate::resolver;
use crate::watch::{self, NameWatch};
use disco_core::{DiscoConfig, DiscoveryConfig};
use disco_transport::MulticastTransport;
use tracing::info;

/// Runs the discovery protocol on one multicast group.
///
/// Every responder and watch started here is tied to the transport's
/// cancellation token, so [`DiscoveryService::shutdown`] stops them all.
#[derive(Debug, Clone)]
pub struct DiscoveryService {
    config: DiscoveryConfig,
    transport: MulticastTransport,
}

impl DiscoveryService {
    /// Creates a discovery service from the full configuration
    pub fn new(config: &DiscoConfig) -> Self {
        Self::with_transport(
            config.discovery.clone(),
            MulticastTransport::new(config.transport.clone()),
        )
    }

    /// Creates a discovery service on an existing transport
    pub fn with_transport(config: DiscoveryConfig, transport: MulticastTransport) -> Self {
        info!(group = %config.group_addr, "Discovery service created");
        Self { config, transport }
    }

    pub fn group(&self) -> &str {
        &self.config.group_addr
    }

    pub fn transport(&self) -> &MulticastTransport {
        &self.transport
    }

    /// Announce `name` and answer queries for it from `source_address`
    pub async fn announce(&self, source_address: &str, name: &str) -> Result<Announcer> {
        announcer::announce(&self.transport, self.group(), source_address, name).await
    }

    /// Wait for each of `names` to be announced
    pub async fn listen_for<I, S>(&self, names: I) -> Result<NameWatch>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        watch::listen_for(&self.transport, self.group(), names).await
    }

    /// Resolve `name` to its owner's address within the query timeout
    pub async fn query(&self, source_address: &str, name: &str) -> Result<String> {
        resolver::query(
            &self.transport,
            self.group(),
            source_address,
            name,
            self.config.query_timeout(),
        )
        .await
    }

    /// Stop every responder, watch and subscription started here
    pub fn shutdown(&self) {
        info!(group = %self.config.group_addr, "Stopping discovery service");
        self.transport.cancellation_token().cancel();
    }
}
