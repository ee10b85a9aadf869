//! # disco-transport
//!
//! UDP multicast primitives underneath disco's service discovery.
//!
//! - [`MulticastTransport::broadcast`] sends one datagram to a group
//!   through a transient socket.
//! - [`MulticastTransport::subscribe`] joins a group and returns a
//!   [`Subscription`], a stream of datagrams fed by a background task that
//!   owns the socket.
//!
//! Every subscription owns an independent socket bound to the group port;
//! the OS delivers a copy of each datagram to every joined socket, so any
//! number of subscribers can share a group without a broker.
//!
//! ## Example
//!
//! ```rust,no_run
//! use disco_transport::{broadcast, subscribe};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut sub = subscribe("224.0.0.1:9999").await?;
//!     broadcast("224.0.0.1:9999", "hello").await?;
//!
//!     if let Some(datagram) = sub.recv().await {
//!         println!("{:?}", datagram?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod multicast;
pub mod socket;

pub use error::{Result, TransportError};
pub use multicast::{broadcast, subscribe, MulticastTransport, ReceivedDatagram, Subscription};
pub use socket::resolve;

// Re-export the token type used for cancellation
pub use tokio_util::sync::CancellationToken;
