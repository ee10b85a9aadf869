//! Resolving a service name to its owner's address

use crate::announcer::validate_field;
use crate::error::{DiscoveryError, Result};
use crate::message::{DiscoveryMessage, MessageKind};
use disco_transport::MulticastTransport;
use std::time::Duration;
use tracing::debug;

/// Ask `group` who owns `name` and wait for the first response.
///
/// Returns the source address carried by the response. The subscription
/// is joined before the query goes out so a fast responder is not missed.
/// If the transport is cancelled first, the result is
/// [`DiscoveryError::Cancelled`].
pub async fn query(
    transport: &MulticastTransport,
    group: &str,
    source_address: &str,
    name: &str,
    wait: Duration,
) -> Result<String> {
    validate_field("name", name)?;
    validate_field("source address", source_address)?;

    let mut subscription = transport.subscribe(group).await?;

    let request = DiscoveryMessage::query(source_address, name).encode();
    transport.broadcast(group, &request).await?;

    let response = async {
        while let Some(next) = subscription.recv().await {
            let datagram = match next {
                Ok(datagram) => datagram,
                Err(e) if !e.is_terminal() => continue,
                Err(e) => return Err(e.into()),
            };

            match DiscoveryMessage::decode(&datagram.message) {
                Ok(message) if message.kind == MessageKind::Response && message.name == name => {
                    debug!(name, owner = %message.source_address, "Query answered");
                    return Ok(message.source_address);
                }
                _ => continue,
            }
        }

        // Subscriptions only end without an error on cancellation
        Err(DiscoveryError::Cancelled {
            name: name.to_string(),
        })
    };

    tokio::time::timeout(wait, response)
        .await
        .map_err(|_| DiscoveryError::Timeout {
            name: name.to_string(),
            timeout: wait,
        })?
}
