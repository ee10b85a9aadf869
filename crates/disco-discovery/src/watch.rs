//! Waiting for named services to show up on a group

use crate::error::Result;
use crate::message::DiscoveryMessage;
use disco_transport::{CancellationToken, MulticastTransport, ReceivedDatagram};
use futures::Stream;
use std::collections::HashSet;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, Sender};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::DropGuard;
use tracing::{debug, warn};

/// Stream of watched names, each yielded once when first seen.
///
/// Ends after the last watched name has been seen, or after a terminal
/// transport error is yielded. Dropping it stops the listener task.
#[derive(Debug)]
pub struct NameWatch {
    inner: ReceiverStream<Result<String>>,
    _guard: DropGuard,
}

impl NameWatch {
    /// Wait for the next name; `None` once every name has been seen.
    pub async fn recv(&mut self) -> Option<Result<String>> {
        self.inner.next().await
    }
}

impl Stream for NameWatch {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Subscribe to `group` and yield each of `names` the first time a
/// discovery message of any kind carries it.
///
/// Duplicate names collapse. With no names the stream ends immediately.
pub async fn listen_for<I, S>(
    transport: &MulticastTransport,
    group: &str,
    names: I,
) -> Result<NameWatch>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let subscription = transport.subscribe(group).await?;
    let watching: HashSet<String> = names.into_iter().map(Into::into).collect();

    debug!(group, count = watching.len(), "Watching for services");

    let (tx, rx) = mpsc::channel(1);
    let cancel = transport.cancellation_token().child_token();

    tokio::spawn(watch_names(subscription, watching, tx, cancel.clone()));

    Ok(NameWatch {
        inner: ReceiverStream::new(rx),
        _guard: cancel.drop_guard(),
    })
}

async fn watch_names<D>(
    mut datagrams: D,
    mut watching: HashSet<String>,
    tx: Sender<Result<String>>,
    cancel: CancellationToken,
) where
    D: Stream<Item = disco_transport::Result<ReceivedDatagram>> + Unpin,
{
    while !watching.is_empty() {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = datagrams.next() => next,
        };

        let datagram = match next {
            Some(Ok(datagram)) => datagram,
            Some(Err(e)) if !e.is_terminal() => continue,
            Some(Err(e)) => {
                warn!(error = %e, "Name watch subscription failed");
                let _ = tx.send(Err(e.into())).await;
                return;
            }
            None => return,
        };

        let Ok(message) = DiscoveryMessage::decode(&datagram.message) else {
            continue;
        };

        if !watching.remove(&message.name) {
            continue;
        }

        debug!(name = %message.name, remaining = watching.len(), "Watched service seen");

        tokio::select! {
            _ = cancel.cancelled() => return,
            sent = tx.send(Ok(message.name)) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }

    debug!("All watched services seen");
}
