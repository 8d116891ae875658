//! Pipeline Node Contract
//!
//! Nodes form a chain from the media producer/consumer ("upstream") to the
//! network ("downstream"). Each node owns a [`NodeCore`] holding its lifecycle
//! state and weak links to its neighbours, and implements [`Node`] to handle
//! data arriving from either side.

use crate::packet::WirePacket;
use parking_lot::RwLock;
use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Node type tag exchanged between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Unknown or rejected
    Unknown,
    /// Plaintext RTP
    Rtp,
    /// Plaintext RTCP
    Rtcp,
    /// SRTP transport, and the marker for RTP it has decrypted
    Srtp,
    /// Marker for RTCP decrypted by the SRTP transport
    Srtcp,
    /// DTLS transport
    Dtls,
    /// ICE/network edge
    Ice,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Unknown => "Unknown",
            NodeType::Rtp => "RTP",
            NodeType::Rtcp => "RTCP",
            NodeType::Srtp => "SRTP",
            NodeType::Srtcp => "SRTCP",
            NodeType::Dtls => "DTLS",
            NodeType::Ice => "ICE",
        };
        f.write_str(name)
    }
}

/// Node lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Created, not yet started
    Uninitialized,
    /// Processing data
    Started,
    /// Stopped for good
    Stopped,
}

/// Link direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the media producer/consumer
    Upstream,
    /// Towards the network
    Downstream,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upstream => write!(f, "upstream"),
            Direction::Downstream => write!(f, "downstream"),
        }
    }
}

/// Node errors
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("{0} node has not started")]
    NotStarted(NodeType),

    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidState { from: NodeState, to: NodeState },

    #[error("No {0} node linked")]
    NotLinked(Direction),

    #[error("{node} node rejected the packet: {source}")]
    Rejected {
        node: NodeType,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl NodeError {
    /// Wrap a node-specific error
    pub fn rejected<E>(node: NodeType, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        NodeError::Rejected {
            node,
            source: Box::new(err),
        }
    }
}

/// A stage of the pipeline
///
/// Lifecycle defaults delegate to [`NodeCore`]; nodes holding resources
/// override [`Node::stop`] and call the core's stop last.
pub trait Node: Send + Sync {
    /// Shared node state and links
    fn core(&self) -> &NodeCore;

    fn node_type(&self) -> NodeType {
        self.core().node_type()
    }

    fn state(&self) -> NodeState {
        self.core().state()
    }

    fn start(&self) -> Result<(), NodeError> {
        self.core().start()
    }

    fn stop(&self) -> Result<(), NodeError> {
        self.core().stop()
    }

    /// Data pushed by the upstream neighbour, heading to the network
    fn on_data_from_upstream(&self, from: NodeType, packet: WirePacket) -> Result<(), NodeError>;

    /// Data pushed by the downstream neighbour, heading to the consumer
    ///
    /// The packet is borrowed: the sender may still hold it, so nodes must
    /// not assume exclusive access to its bytes.
    fn on_data_from_downstream(&self, from: NodeType, packet: &WirePacket)
        -> Result<(), NodeError>;
}

/// State and links shared by every node
pub struct NodeCore {
    node_type: NodeType,
    state: RwLock<NodeState>,
    upstream: RwLock<Option<Weak<dyn Node>>>,
    downstream: RwLock<Option<Weak<dyn Node>>>,
}

impl NodeCore {
    pub fn new(node_type: NodeType) -> Self {
        NodeCore {
            node_type,
            state: RwLock::new(NodeState::Uninitialized),
            upstream: RwLock::new(None),
            downstream: RwLock::new(None),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn state(&self) -> NodeState {
        *self.state.read()
    }

    pub fn is_started(&self) -> bool {
        self.state() == NodeState::Started
    }

    /// Move to `Started`
    pub fn start(&self) -> Result<(), NodeError> {
        let mut state = self.state.write();
        match *state {
            NodeState::Uninitialized => {
                *state = NodeState::Started;
                tracing::debug!("{} node started", self.node_type);
                Ok(())
            }
            NodeState::Started => Ok(()),
            NodeState::Stopped => Err(NodeError::InvalidState {
                from: NodeState::Stopped,
                to: NodeState::Started,
            }),
        }
    }

    /// Move to `Stopped` and drop the links (idempotent)
    pub fn stop(&self) -> Result<(), NodeError> {
        let mut state = self.state.write();
        if *state != NodeState::Stopped {
            *state = NodeState::Stopped;
            *self.upstream.write() = None;
            *self.downstream.write() = None;
            tracing::debug!("{} node stopped", self.node_type);
        }
        Ok(())
    }

    pub fn set_upstream(&self, node: Weak<dyn Node>) {
        *self.upstream.write() = Some(node);
    }

    pub fn set_downstream(&self, node: Weak<dyn Node>) {
        *self.downstream.write() = Some(node);
    }

    fn neighbour(&self, direction: Direction) -> Result<Arc<dyn Node>, NodeError> {
        let link = match direction {
            Direction::Upstream => self.upstream.read(),
            Direction::Downstream => self.downstream.read(),
        };
        link.as_ref()
            .and_then(Weak::upgrade)
            .ok_or(NodeError::NotLinked(direction))
    }

    /// Push a packet to the next node, towards the network
    pub fn send_to_downstream(&self, packet: WirePacket) -> Result<(), NodeError> {
        let next = self.neighbour(Direction::Downstream)?;
        next.on_data_from_upstream(self.node_type, packet)
    }

    /// Push a packet to the previous node, towards the consumer
    pub fn send_to_upstream(&self, node_type: NodeType, packet: WirePacket) -> Result<(), NodeError> {
        let prev = self.neighbour(Direction::Upstream)?;
        prev.on_data_from_downstream(node_type, &packet)
    }
}

impl fmt::Debug for NodeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCore")
            .field("node_type", &self.node_type)
            .field("state", &self.state())
            .finish()
    }
}

/// Link two nodes so that `upstream` sends down into `downstream` and back
pub fn link<U, D>(upstream: &Arc<U>, downstream: &Arc<D>)
where
    U: Node + 'static,
    D: Node + 'static,
{
    let up = Arc::downgrade(upstream);
    let down = Arc::downgrade(downstream);
    let (up, down): (Weak<dyn Node>, Weak<dyn Node>) = (up, down);
    upstream.core().set_downstream(down);
    downstream.core().set_upstream(up);
}
