//! Error types for the discovery protocol

use disco_transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors that can occur during service discovery
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Caller supplied an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Datagram is not a discovery message
    #[error("Failed to decode discovery message: {0}")]
    Decode(#[from] DecodeError),

    /// Underlying multicast transport failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No response arrived in time
    #[error("No response for '{name}' within {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// Subscription was cancelled before an answer arrived
    #[error("Query for '{name}' was cancelled")]
    Cancelled { name: String },
}

/// Reasons a datagram fails to decode as a discovery message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Missing `srvc` prefix or wrong number of fields
    #[error("missing protocol declaration")]
    MissingProtocol,

    /// Kind, source address or name is empty
    #[error("missing message kind, address or name")]
    EmptyField,

    /// Kind is not one of the known tokens
    #[error("unknown message kind '{0}'")]
    UnknownKind(String),
}
