//! Presence announcement and the query responder behind it

use crate::error::{DiscoveryError, Result};
use crate::message::{DiscoveryMessage, MessageKind};
use disco_transport::{CancellationToken, MulticastTransport, Subscription};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to an announced service and its responder task.
///
/// The responder keeps answering queries until [`Announcer::stop`] is
/// called, the transport's token is cancelled, or its subscription
/// fails. Dropping the handle leaves the responder running.
#[derive(Debug)]
pub struct Announcer {
    group: String,
    source_address: String,
    name: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Announcer {
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token that stops the responder when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns whether the responder is still answering queries
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the responder to stop without waiting for it
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop the responder and wait until its socket is released
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(name = %self.name, error = %e, "Responder task failed");
        }
    }
}

/// Rejects values that cannot be carried in a `srvc` record.
pub(crate) fn validate_field(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(DiscoveryError::InvalidArgument(format!(
            "{field} cannot be empty"
        )));
    }

    if value.contains(';') {
        return Err(DiscoveryError::InvalidArgument(format!(
            "{field} cannot contain ';'"
        )));
    }

    Ok(())
}

/// Announce `name` on `group` and answer queries for it.
///
/// The responder joins the group before the announcement is sent, so a
/// query issued as soon as this returns is answered. Each call starts an
/// independent responder.
pub async fn announce(
    transport: &MulticastTransport,
    group: &str,
    source_address: &str,
    name: &str,
) -> Result<Announcer> {
    validate_field("name", name)?;
    validate_field("source address", source_address)?;

    let subscription = transport.subscribe(group).await?;
    let cancel = transport.cancellation_token().child_token();

    let task = tokio::spawn(respond_to_queries(
        transport.clone(),
        group.to_string(),
        subscription,
        DiscoveryMessage::response(source_address, name),
        cancel.clone(),
    ));

    let announcement = DiscoveryMessage::announce(source_address, name).encode();
    if let Err(e) = transport.broadcast(group, &announcement).await {
        cancel.cancel();
        return Err(e.into());
    }

    info!(group, name, source_address, "Service announced");

    Ok(Announcer {
        group: group.to_string(),
        source_address: source_address.to_string(),
        name: name.to_string(),
        cancel,
        task,
    })
}

async fn respond_to_queries(
    transport: MulticastTransport,
    group: String,
    mut subscription: Subscription,
    response: DiscoveryMessage,
    cancel: CancellationToken,
) {
    let reply = response.encode();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = subscription.recv() => next,
        };

        let datagram = match next {
            Some(Ok(datagram)) => datagram,
            Some(Err(e)) if !e.is_terminal() => {
                debug!(error = %e, "Skipping datagram");
                continue;
            }
            Some(Err(e)) => {
                warn!(name = %response.name, error = %e, "Responder subscription failed");
                break;
            }
            None => break,
        };

        let Ok(message) = DiscoveryMessage::decode(&datagram.message) else {
            continue;
        };

        if message.kind == MessageKind::Query && message.name == response.name {
            debug!(name = %response.name, from = %datagram.source, "Answering query");

            if let Err(e) = transport.broadcast(&group, &reply).await {
                warn!(name = %response.name, error = %e, "Failed to respond to query");
            }
        }
    }

    info!(name = %response.name, "Responder stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_field() {
        assert!(validate_field("name", "svcA").is_ok());
        assert!(matches!(
            validate_field("name", ""),
            Err(DiscoveryError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_field("name", "a;b"),
            Err(DiscoveryError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_announce_rejects_empty_name() {
        let transport = MulticastTransport::default();
        let result = announce(&transport, "224.0.0.1:9999", "192.168.0.1", "").await;
        assert!(matches!(result, Err(DiscoveryError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_announce_rejects_bad_address() {
        let transport = MulticastTransport::default();
        let result = announce(&transport, "224.0.0.1", "192.168.0.1", "svcA").await;
        assert!(matches!(result, Err(DiscoveryError::Transport(_))));
    }
}
