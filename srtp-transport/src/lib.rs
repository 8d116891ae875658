//! SRTP Secure Transport
//!
//! A pipeline node that protects RTP/RTCP on its way to the network and
//! unprotects SRTP/SRTCP arriving from it. Keys come either as one
//! send/receive pair or as per-channel receive keys for interleaved
//! (RTSP-over-TCP) connections.

pub mod error;
pub mod registry;
pub mod stats;
pub mod transport;

pub use error::{ErrorKind, KeySlot, SessionRole, TransportError};
pub use registry::{normalize_channel, ChannelSessionRegistry};
pub use stats::TransportStats;
pub use transport::SrtpTransport;
