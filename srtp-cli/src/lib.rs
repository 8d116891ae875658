//! SRTP CLI Library
//!
//! Shared functionality for SRTP command-line tools.

pub mod config;
pub mod loopback;
pub mod stats;

pub use config::{ChannelKeyConfig, Config, ConfigError, LoopbackConfig, SingleKeyConfig};
pub use loopback::{Loopback, LoopbackError, LoopbackReport, WireNode};
pub use stats::{display_compact_stats, display_transport_stats, format_bytes, format_duration};
