//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use disco_core::{DiscoConfig, DiscoveryConfig, TransportConfig};
use disco_discovery::DiscoveryService;
use disco_transport::MulticastTransport;
use std::future::Future;
use std::time::Duration;

/// Upper bound for any single await in a test
pub const WAIT: Duration = Duration::from_secs(5);

/// Delay that lets a freshly spawned task reach its first receive
pub const SETTLE: Duration = Duration::from_millis(100);

/// Group on a port of its own, so parallel tests never see each other's traffic
pub fn group(port: u16) -> String {
    format!("239.255.77.1:{}", port)
}

/// Transport settings shared by every test
pub fn transport_config() -> TransportConfig {
    TransportConfig {
        multicast_loop: true,
        ..Default::default()
    }
}

pub fn transport() -> MulticastTransport {
    MulticastTransport::new(transport_config())
}

pub fn service(port: u16) -> DiscoveryService {
    let config = DiscoConfig {
        transport: transport_config(),
        discovery: DiscoveryConfig {
            group_addr: group(port),
            query_timeout_ms: 2000,
        },
    };
    DiscoveryService::new(&config)
}

/// Await `fut`, failing the test if it takes longer than [`WAIT`]
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(WAIT, fut)
        .await
        .expect("timed out waiting for multicast traffic")
}
