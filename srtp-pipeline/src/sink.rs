//! Terminal node that records what reaches it.

use crate::node::{Direction, Node, NodeCore, NodeError, NodeType};
use crate::packet::WirePacket;
use parking_lot::Mutex;

/// Packet captured by a [`SinkNode`]
#[derive(Debug, Clone)]
pub struct ReceivedPacket {
    /// Side the packet arrived from
    pub direction: Direction,
    /// Type announced by the sending node
    pub from: NodeType,
    pub packet: WirePacket,
}

/// End of a pipeline: collects packets instead of forwarding them
pub struct SinkNode {
    core: NodeCore,
    received: Mutex<Vec<ReceivedPacket>>,
}

impl SinkNode {
    pub fn new(node_type: NodeType) -> Self {
        SinkNode {
            core: NodeCore::new(node_type),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Drain the captured packets
    pub fn take(&self) -> Vec<ReceivedPacket> {
        std::mem::take(&mut *self.received.lock())
    }

    pub fn len(&self) -> usize {
        self.received.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.lock().is_empty()
    }

    fn record(&self, direction: Direction, from: NodeType, packet: WirePacket) -> Result<(), NodeError> {
        if !self.core.is_started() {
            return Err(NodeError::NotStarted(self.core.node_type()));
        }
        self.received.lock().push(ReceivedPacket {
            direction,
            from,
            packet,
        });
        Ok(())
    }
}

impl Node for SinkNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn on_data_from_upstream(&self, from: NodeType, packet: WirePacket) -> Result<(), NodeError> {
        self.record(Direction::Upstream, from, packet)
    }

    fn on_data_from_downstream(
        &self,
        from: NodeType,
        packet: &WirePacket,
    ) -> Result<(), NodeError> {
        self.record(Direction::Downstream, from, packet.clone())
    }
}
