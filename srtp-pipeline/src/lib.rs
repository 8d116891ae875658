//! Media Pipeline Nodes
//!
//! This crate defines the bidirectional node chain that media packets travel
//! through: node types and lifecycle, the upstream/downstream send primitives,
//! channel-tagged wire packets, RTP/RTCP discrimination, and the interleaved
//! framing used when several RTP/RTCP pairs share one byte stream.

pub mod interleaved;
pub mod node;
pub mod packet;
pub mod sink;

pub use interleaved::{encode_frame, InterleavedDecoder, InterleavedError, MAX_FRAME_PAYLOAD};
pub use node::{link, Direction, Node, NodeCore, NodeError, NodeState, NodeType};
pub use packet::{ChannelId, PacketKind, WirePacket, MIN_PACKET_SIZE};
pub use sink::{ReceivedPacket, SinkNode};
