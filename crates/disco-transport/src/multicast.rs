//! Multicast broadcast and subscription

use crate::error::{Result, TransportError};
use crate::socket::{group_socket, resolve, sender_socket};
use disco_core::TransportConfig;
use futures::Stream;
use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::ReadBuf;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, Sender};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

/// One datagram read from a multicast group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedDatagram {
    /// Payload as text
    pub message: String,
    /// Sender's address
    pub source: SocketAddr,
}

/// Sends and receives datagrams on multicast groups.
///
/// Cloning is cheap enough to hand one to each background task. All
/// receive loops started through a transport are children of its
/// cancellation token.
#[derive(Debug, Clone)]
pub struct MulticastTransport {
    config: TransportConfig,
    cancel: CancellationToken,
}

impl Default for MulticastTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl MulticastTransport {
    /// Create a new transport
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Tie every subscription to `cancel`; cancelling it stops them all.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the transport configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Get the token that parents every subscription
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Send `message` as a single datagram to `addr`.
    ///
    /// The socket is opened for this one write and closed afterwards.
    /// Nothing is sent if the message exceeds the configured maximum.
    pub async fn broadcast(&self, addr: &str, message: &str) -> Result<()> {
        let max = self.config.max_datagram_size;
        if message.len() > max {
            return Err(TransportError::MessageTooLarge {
                size: message.len(),
                max,
            });
        }

        let target = resolve(addr).await?;
        let socket = sender_socket(&target, &self.config)?;

        socket
            .connect(target)
            .await
            .map_err(|e| TransportError::socket(target, e))?;

        let sent = socket
            .send(message.as_bytes())
            .await
            .map_err(|e| TransportError::socket(target, e))?;

        if sent != message.len() {
            warn!(
                expected = message.len(),
                actual = sent,
                "Partial UDP datagram sent"
            );
        }

        debug!(%target, size = sent, "Broadcast datagram");
        Ok(())
    }

    /// Join the group at `addr` and stream every datagram it receives.
    ///
    /// Resolution, bind and join failures are returned here. Each call
    /// owns its own socket and receive task.
    pub async fn subscribe(&self, addr: &str) -> Result<Subscription> {
        let group = resolve(addr).await?;
        let socket = group_socket(&group, &self.config)?;

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let cancel = self.cancel.child_token();

        tokio::spawn(receive_loop(
            socket,
            group,
            tx,
            cancel.clone(),
            self.config.max_datagram_size,
        ));

        info!(%group, "Subscribed to multicast group");

        Ok(Subscription {
            group,
            inner: ReceiverStream::new(rx),
            _guard: cancel.drop_guard(),
        })
    }
}

/// Stream of datagrams from one multicast socket.
///
/// Yields `Ok` per datagram in socket order. An `Err` that
/// [`TransportError::is_terminal`] is the last item. Dropping the
/// subscription stops the receive task and closes the socket.
#[derive(Debug)]
pub struct Subscription {
    group: SocketAddr,
    inner: ReceiverStream<Result<ReceivedDatagram>>,
    _guard: DropGuard,
}

impl Subscription {
    /// Group this subscription joined
    pub fn group(&self) -> SocketAddr {
        self.group
    }

    /// Wait for the next datagram; `None` once the stream has finished.
    pub async fn recv(&mut self) -> Option<Result<ReceivedDatagram>> {
        self.inner.next().await
    }
}

impl Stream for Subscription {
    type Item = Result<ReceivedDatagram>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Anything a receive loop can read datagrams from.
pub(crate) trait DatagramSource: Send + Sync + 'static {
    fn poll_recv_from(
        &self,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<SocketAddr>>;
}

impl DatagramSource for UdpSocket {
    fn poll_recv_from(
        &self,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<SocketAddr>> {
        UdpSocket::poll_recv_from(self, cx, buf)
    }
}

async fn recv_datagram<S: DatagramSource>(
    source: &S,
    buffer: &mut [u8],
) -> io::Result<(usize, SocketAddr)> {
    poll_fn(|cx| {
        let mut buf = ReadBuf::new(&mut *buffer);
        let from = ready!(source.poll_recv_from(cx, &mut buf))?;
        Poll::Ready(Ok((buf.filled().len(), from)))
    })
    .await
}

/// Turns one receive result into a stream item and whether it ends the stream.
fn classify(
    received: io::Result<(usize, SocketAddr)>,
    buffer: &[u8],
    group: SocketAddr,
    max_size: usize,
) -> (Result<ReceivedDatagram>, bool) {
    match received {
        Ok((size, _)) if size > max_size => {
            warn!(%group, max_size, "Dropping oversized datagram");
            (Err(TransportError::MessageTooLarge { size, max: max_size }), false)
        }
        Ok((size, source)) => match String::from_utf8(buffer[..size].to_vec()) {
            Ok(message) => (Ok(ReceivedDatagram { message, source }), false),
            Err(_) => {
                warn!(%group, %source, "Dropping datagram that is not UTF-8");
                (Err(TransportError::InvalidText { from: source }), false)
            }
        },
        Err(e) if is_message_too_large(&e) => {
            warn!(%group, max_size, "Dropping oversized datagram");
            (
                Err(TransportError::MessageTooLarge {
                    size: max_size + 1,
                    max: max_size,
                }),
                false,
            )
        }
        Err(e) => {
            error!(%group, error = %e, "Error receiving multicast datagram");
            let err = TransportError::Read {
                addr: group.to_string(),
                source: e,
            };
            (Err(err), true)
        }
    }
}

async fn receive_loop<S: DatagramSource>(
    socket: S,
    group: SocketAddr,
    tx: Sender<Result<ReceivedDatagram>>,
    cancel: CancellationToken,
    max_size: usize,
) {
    // One spare byte so oversized datagrams are detected rather than truncated
    let mut buffer = vec![0u8; max_size + 1];

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(%group, "Receive task cancelled");
                break;
            }
            result = recv_datagram(&socket, &mut buffer) => result,
        };

        let (item, terminal) = classify(received, &buffer, group, max_size);

        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = tx.send(item) => {
                if sent.is_err() {
                    debug!(%group, "Subscriber dropped");
                    break;
                }
            }
        }

        if terminal {
            break;
        }
    }

    debug!(%group, "Receive task stopped");
}

#[cfg(windows)]
fn is_message_too_large(e: &std::io::Error) -> bool {
    // WSAEMSGSIZE
    e.raw_os_error() == Some(10040)
}

#[cfg(not(windows))]
fn is_message_too_large(_: &std::io::Error) -> bool {
    false
}

/// Broadcast with the default transport configuration.
pub async fn broadcast(addr: &str, message: &str) -> Result<()> {
    MulticastTransport::default().broadcast(addr, message).await
}

/// Subscribe with the default transport configuration.
pub async fn subscribe(addr: &str) -> Result<Subscription> {
    MulticastTransport::default().subscribe(addr).await
}
