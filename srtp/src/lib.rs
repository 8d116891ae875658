//! SRTP - Secure Real-time Transport
//!
//! Rust API for the SRTP transport node and the pieces it is built from.

pub use srtp_crypto as crypto;
pub use srtp_pipeline as pipeline;
pub use srtp_transport as transport;

// Re-export commonly used types
pub use crypto::{CryptoSuite, SrtpSession, SsrcPolicy};
pub use pipeline::{ChannelId, Node, NodeType, WirePacket};
pub use transport::{SrtpTransport, TransportError};
