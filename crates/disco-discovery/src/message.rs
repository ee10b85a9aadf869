//! Wire format for discovery messages
//!
//! Each datagram carries one `srvc;<kind>;<source address>;<name>` record.

use crate::error::DecodeError;
use std::fmt;
use std::str::FromStr;

/// Leading field of every discovery record
pub const PROTOCOL_TAG: &str = "srvc";

const SEPARATOR: char = ';';

/// Kind of discovery message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A service declaring its presence
    Announce,
    /// A request for the owner of a name to respond
    Query,
    /// The owner's reply to a query
    Response,
}

impl MessageKind {
    /// Returns the wire token for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Announce => "announce",
            MessageKind::Query => "query",
            MessageKind::Response => "response",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "announce" => Ok(MessageKind::Announce),
            "query" => Ok(MessageKind::Query),
            "response" => Ok(MessageKind::Response),
            "" => Err(DecodeError::EmptyField),
            other => Err(DecodeError::UnknownKind(other.to_string())),
        }
    }
}

/// A decoded discovery record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveryMessage {
    pub kind: MessageKind,
    /// Address the sender wants peers to use; opaque to the protocol
    pub source_address: String,
    pub name: String,
}

impl DiscoveryMessage {
    pub fn new(kind: MessageKind, source_address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            source_address: source_address.into(),
            name: name.into(),
        }
    }

    pub fn announce(source_address: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(MessageKind::Announce, source_address, name)
    }

    pub fn query(source_address: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(MessageKind::Query, source_address, name)
    }

    pub fn response(source_address: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(MessageKind::Response, source_address, name)
    }

    /// Serialize to the wire format
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse a record from the wire format.
    ///
    /// Exactly four fields are required, the first being `srvc`, and
    /// none may be empty. Fields are not trimmed.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let fields: Vec<&str> = text.split(SEPARATOR).collect();

        let &[tag, kind, source_address, name] = fields.as_slice() else {
            return Err(DecodeError::MissingProtocol);
        };

        if tag != PROTOCOL_TAG {
            return Err(DecodeError::MissingProtocol);
        }

        if kind.is_empty() || source_address.is_empty() || name.is_empty() {
            return Err(DecodeError::EmptyField);
        }

        Ok(Self {
            kind: kind.parse()?,
            source_address: source_address.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for DiscoveryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PROTOCOL_TAG}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.kind, self.source_address, self.name
        )
    }
}

impl FromStr for DiscoveryMessage {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
