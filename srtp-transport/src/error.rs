//! Transport errors.

use srtp_crypto::CryptoError;
use srtp_pipeline::{ChannelId, NodeError, NodeState, NodeType};
use std::fmt;
use thiserror::Error;

/// Session a packet needed but did not find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Single-key send session
    Send,
    /// Single-key receive session
    Receive,
    /// Channel session; the packet carried no channel tag
    Channel,
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionRole::Send => write!(f, "send"),
            SessionRole::Receive => write!(f, "receive"),
            SessionRole::Channel => write!(f, "channel"),
        }
    }
}

/// Slot a key assignment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySlot {
    /// Send + receive session pair
    SingleKey,
    /// Registry entry for a normalized channel
    Channel(ChannelId),
}

impl fmt::Display for KeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySlot::SingleKey => write!(f, "single-key sessions"),
            KeySlot::Channel(channel) => write!(f, "channel {}", channel),
        }
    }
}

/// Drop counter a failure is accounted under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotStarted,
    MalformedPacket,
    NoSession,
    DuplicateKeying,
    CryptoFailure,
    UnknownChannel,
    UnsupportedNodeType,
    SessionSetup,
    Forward,
}

/// Secure transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport is not started (state {0:?})")]
    NotStarted(NodeState),

    #[error("Malformed packet: {len} bytes")]
    MalformedPacket { len: usize },

    #[error("No {0} session")]
    NoSession(SessionRole),

    #[error("Key material already assigned for {0}")]
    DuplicateKeying(KeySlot),

    #[error("Crypto failure: {0}")]
    CryptoFailure(#[from] CryptoError),

    #[error("No SRTP session for interleaved channel {0}")]
    UnknownChannel(ChannelId),

    #[error("Cannot protect packets from {0} node")]
    UnsupportedNodeType(NodeType),

    #[error("Failed to create session: {0}")]
    SessionSetup(#[source] CryptoError),

    #[error("Forwarding failed: {0}")]
    Forward(#[from] NodeError),
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::NotStarted(_) => ErrorKind::NotStarted,
            TransportError::MalformedPacket { .. } => ErrorKind::MalformedPacket,
            TransportError::NoSession(_) => ErrorKind::NoSession,
            TransportError::DuplicateKeying(_) => ErrorKind::DuplicateKeying,
            TransportError::CryptoFailure(_) => ErrorKind::CryptoFailure,
            TransportError::UnknownChannel(_) => ErrorKind::UnknownChannel,
            TransportError::UnsupportedNodeType(_) => ErrorKind::UnsupportedNodeType,
            TransportError::SessionSetup(_) => ErrorKind::SessionSetup,
            TransportError::Forward(_) => ErrorKind::Forward,
        }
    }
}
