//! Error types for the multicast transport

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while sending or receiving multicast datagrams
#[derive(Debug, Error)]
pub enum TransportError {
    /// Address was malformed or could not be resolved
    #[error("Failed to resolve address '{addr}': {reason}")]
    AddressResolution { addr: String, reason: String },

    /// Socket creation, bind, join or send failed
    #[error("Socket error on {addr}: {source}")]
    Socket {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Receive failed; the subscription is finished
    #[error("Failed to read from {addr}: {source}")]
    Read {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Datagram exceeds the configured maximum size
    #[error("Datagram of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },

    /// Datagram payload is not valid UTF-8
    #[error("Datagram from {from} is not valid UTF-8")]
    InvalidText { from: SocketAddr },
}

impl TransportError {
    pub(crate) fn socket(addr: impl ToString, source: io::Error) -> Self {
        Self::Socket {
            addr: addr.to_string(),
            source,
        }
    }

    /// Returns true if no further datagrams follow this error on a stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::MessageTooLarge { .. } | Self::InvalidText { .. }
        )
    }
}
