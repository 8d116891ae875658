//! Secure Transport Node
//!
//! Sits between the RTP/RTCP producer and the network. Packets from upstream
//! are protected with the send session and passed down; packets from the
//! network are routed to a receive session, unprotected and passed up.
//!
//! Two keying modes exist:
//! - single key: one send and one receive session ([`SrtpTransport::set_key_material`])
//! - multiplexed: one receive session per interleaved channel pair
//!   ([`SrtpTransport::add_channel_key_material`])
//!
//! When both are configured the channel registry wins for inbound routing and
//! the single send session remains the only outbound session.

use crate::error::{KeySlot, SessionRole, TransportError};
use crate::registry::{normalize_channel, ChannelSessionRegistry};
use crate::stats::TransportStats;
use bytes::BytesMut;
use parking_lot::{Mutex, RwLock};
use srtp_crypto::{
    CryptoSession, CryptoSuite, SessionFactory, SrtpSessionFactory, SsrcPolicy,
};
use srtp_pipeline::{
    ChannelId, Node, NodeCore, NodeError, NodeState, NodeType, PacketKind, WirePacket,
    MIN_PACKET_SIZE,
};
use tracing::{debug, info, trace, warn};

/// Sessions owned by the node
struct Sessions<S> {
    send: Option<Mutex<S>>,
    recv: Option<Mutex<S>>,
    channels: ChannelSessionRegistry<S>,
}

impl<S: CryptoSession> Sessions<S> {
    fn new() -> Self {
        Sessions {
            send: None,
            recv: None,
            channels: ChannelSessionRegistry::new(),
        }
    }

    /// Receive session for an inbound packet
    fn resolve(&self, packet: &WirePacket) -> Result<&Mutex<S>, TransportError> {
        if !self.channels.is_empty() {
            let channel = match packet.channel() {
                Some(channel) => channel,
                None => {
                    warn!("Channel SRTP is configured but the packet has no channel tag");
                    return Err(TransportError::NoSession(SessionRole::Channel));
                }
            };
            return self.channels.get(channel).ok_or_else(|| {
                warn!("No SRTP session for interleaved channel {}", channel);
                TransportError::UnknownChannel(channel)
            });
        }

        self.recv
            .as_ref()
            .ok_or(TransportError::NoSession(SessionRole::Receive))
    }

    /// Release every session; returns how many were released
    fn release_all(&mut self) -> usize {
        let mut released = 0;
        for slot in [&mut self.send, &mut self.recv] {
            if let Some(session) = slot.take() {
                session.into_inner().release();
                released += 1;
            }
        }
        released + self.channels.release_all()
    }
}

/// SRTP/SRTCP transport node
pub struct SrtpTransport<F: SessionFactory = SrtpSessionFactory> {
    core: NodeCore,
    factory: F,
    sessions: RwLock<Sessions<F::Session>>,
    stats: Mutex<TransportStats>,
}

impl SrtpTransport {
    pub fn new() -> Self {
        Self::with_factory(SrtpSessionFactory)
    }
}

impl Default for SrtpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: SessionFactory> SrtpTransport<F> {
    /// Create a transport whose sessions come from `factory`
    pub fn with_factory(factory: F) -> Self {
        SrtpTransport {
            core: NodeCore::new(NodeType::Srtp),
            factory,
            sessions: RwLock::new(Sessions::new()),
            stats: Mutex::new(TransportStats::default()),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Statistics snapshot
    pub fn stats(&self) -> TransportStats {
        self.stats.lock().clone()
    }

    /// Whether single-key sessions are installed
    pub fn has_single_key(&self) -> bool {
        let sessions = self.sessions.read();
        sessions.send.is_some() || sessions.recv.is_some()
    }

    /// Number of keyed channel pairs
    pub fn channel_count(&self) -> usize {
        self.sessions.read().channels.len()
    }

    /// Keyed channels (normalized ids), ascending
    pub fn channels(&self) -> Vec<ChannelId> {
        self.sessions.read().channels.channels()
    }

    /// Install the single-key send and receive sessions
    ///
    /// `local_key` protects what this node sends, `remote_key` unprotects what
    /// the peer sends. Both are master key || master salt. Fails without
    /// touching the node if either session already exists.
    pub fn set_key_material(
        &self,
        suite: CryptoSuite,
        local_key: &[u8],
        remote_key: &[u8],
    ) -> Result<(), TransportError> {
        let mut sessions = self.sessions.write();
        self.check_not_stopped()?;
        if sessions.send.is_some() || sessions.recv.is_some() {
            return Err(TransportError::DuplicateKeying(KeySlot::SingleKey));
        }

        let mut send = self
            .factory
            .create(SsrcPolicy::AnyOutbound, suite, local_key)
            .map_err(TransportError::SessionSetup)?;
        let recv = match self.factory.create(SsrcPolicy::AnyInbound, suite, remote_key) {
            Ok(recv) => recv,
            Err(err) => {
                send.release();
                return Err(TransportError::SessionSetup(err));
            }
        };

        if !sessions.channels.is_empty() {
            warn!(
                "Single-key SRTP installed next to {} channel sessions; inbound packets keep using the channels",
                sessions.channels.len()
            );
        }

        sessions.send = Some(Mutex::new(send));
        sessions.recv = Some(Mutex::new(recv));
        info!("SRTP keys installed ({})", suite);
        Ok(())
    }

    /// Key one interleaved channel pair for receiving
    ///
    /// An odd (RTCP) channel is stored under its even RTP pair, so keying
    /// channel 5 after channel 4 is a duplicate.
    pub fn add_channel_key_material(
        &self,
        channel: ChannelId,
        suite: CryptoSuite,
        key: &[u8],
    ) -> Result<(), TransportError> {
        let normalized = normalize_channel(channel);
        let mut sessions = self.sessions.write();
        self.check_not_stopped()?;
        if sessions.channels.contains(normalized) {
            return Err(TransportError::DuplicateKeying(KeySlot::Channel(normalized)));
        }

        let session = self
            .factory
            .create(SsrcPolicy::AnyInbound, suite, key)
            .map_err(TransportError::SessionSetup)?;

        if sessions.recv.is_some() && sessions.channels.is_empty() {
            warn!("Channel SRTP installed on a single-key transport; inbound packets now route by channel");
        }

        if let Err(mut session) = sessions.channels.insert(normalized, session) {
            session.release();
            return Err(TransportError::DuplicateKeying(KeySlot::Channel(normalized)));
        }
        info!(
            "SRTP keys installed for interleaved channels {}/{} ({})",
            normalized,
            normalized.rtcp_channel(),
            suite
        );
        Ok(())
    }

    fn check_not_stopped(&self) -> Result<(), TransportError> {
        match self.core.state() {
            NodeState::Stopped => Err(TransportError::NotStarted(NodeState::Stopped)),
            _ => Ok(()),
        }
    }

    fn check_started(&self) -> Result<(), TransportError> {
        match self.core.state() {
            NodeState::Started => Ok(()),
            state => {
                trace!("SRTP transport dropped a packet in state {:?}", state);
                Err(TransportError::NotStarted(state))
            }
        }
    }

    fn record<T>(&self, result: Result<T, TransportError>) -> Result<T, TransportError> {
        if let Err(err) = &result {
            self.stats.lock().record_drop(err.kind());
        }
        result
    }

    /// Protect a packet from the producer and pass it to the network side
    ///
    /// `from` must be [`NodeType::Rtp`] or [`NodeType::Rtcp`]. A channel tag,
    /// if present, is kept.
    pub fn protect_outbound(&self, from: NodeType, packet: WirePacket) -> Result<(), TransportError> {
        let result = self.try_protect(from, packet);
        self.record(result)
    }

    fn try_protect(&self, from: NodeType, packet: WirePacket) -> Result<(), TransportError> {
        self.check_started()?;
        if packet.len() < MIN_PACKET_SIZE {
            return Err(TransportError::MalformedPacket { len: packet.len() });
        }

        let (kind, protected) = {
            let sessions = self.sessions.read();
            let send = sessions
                .send
                .as_ref()
                .ok_or(TransportError::NoSession(SessionRole::Send))?;
            let kind = match from {
                NodeType::Rtp => PacketKind::Rtp,
                NodeType::Rtcp => PacketKind::Rtcp,
                other => return Err(TransportError::UnsupportedNodeType(other)),
            };

            let mut buf = BytesMut::from(&packet.payload()[..]);
            let mut session = send.lock();
            let result = match kind {
                PacketKind::Rtp => session.protect_rtp(&mut buf),
                PacketKind::Rtcp => session.protect_rtcp(&mut buf),
            };
            result.map_err(|err| {
                debug!("Failed to protect {} packet: {}", kind, err);
                err
            })?;
            (kind, packet.with_payload(buf.freeze()))
        };

        self.core.send_to_downstream(protected)?;
        self.stats.lock().record_protected(kind, packet.len());
        Ok(())
    }

    /// Unprotect a packet from the network and pass it to the consumer
    ///
    /// The input is never modified. The output is announced as
    /// [`NodeType::Srtp`] (decrypted RTP) or [`NodeType::Srtcp`] (decrypted
    /// RTCP) and keeps the input's channel tag.
    pub fn unprotect_inbound(&self, from: NodeType, packet: &WirePacket) -> Result<(), TransportError> {
        let result = self.try_unprotect(from, packet);
        self.record(result)
    }

    fn try_unprotect(&self, from: NodeType, packet: &WirePacket) -> Result<(), TransportError> {
        self.check_started()?;
        let payload = packet.payload();
        if payload.len() < MIN_PACKET_SIZE {
            trace!("Dropping {} byte packet from {}", payload.len(), from);
            return Err(TransportError::MalformedPacket { len: payload.len() });
        }

        let (kind, plain) = {
            let sessions = self.sessions.read();
            let session = sessions.resolve(packet)?;

            // Headers are in the clear, so classify before decrypting
            let kind = PacketKind::from_second_octet(payload[1]);
            let mut buf = BytesMut::from(&payload[..]);
            let mut session = session.lock();
            let result = match kind {
                PacketKind::Rtp => session.unprotect_rtp(&mut buf),
                PacketKind::Rtcp => session.unprotect_rtcp(&mut buf),
            };
            result.map_err(|err| {
                debug!("Failed to unprotect {} packet: {}", kind, err);
                err
            })?;
            (kind, buf.freeze())
        };

        let node_type = match kind {
            PacketKind::Rtp => NodeType::Srtp,
            PacketKind::Rtcp => NodeType::Srtcp,
        };
        self.core.send_to_upstream(node_type, packet.with_payload(plain))?;
        self.stats.lock().record_unprotected(kind, payload.len());
        Ok(())
    }
}

impl<F: SessionFactory> Node for SrtpTransport<F> {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    /// Release every session, then stop the node
    ///
    /// Safe to call repeatedly; sessions are released once.
    fn stop(&self) -> Result<(), NodeError> {
        let mut sessions = self.sessions.write();
        let released = sessions.release_all();
        if self.core.state() != NodeState::Stopped {
            info!("SRTP transport stopping, released {} sessions", released);
        }
        self.core.stop()
    }

    fn on_data_from_upstream(&self, from: NodeType, packet: WirePacket) -> Result<(), NodeError> {
        self.protect_outbound(from, packet)
            .map_err(|err| NodeError::rejected(NodeType::Srtp, err))
    }

    fn on_data_from_downstream(
        &self,
        from: NodeType,
        packet: &WirePacket,
    ) -> Result<(), NodeError> {
        self.unprotect_inbound(from, packet)
            .map_err(|err| NodeError::rejected(NodeType::Srtp, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use srtp_pipeline::{link, Direction, SinkNode};
    use std::sync::Arc;

    const SUITE: CryptoSuite = CryptoSuite::AesCm128HmacSha1_80;

    fn key(seed: u8) -> Vec<u8> {
        vec![seed; SUITE.key_material_len()]
    }

    fn rtp(seq: u16, payload: &[u8]) -> Bytes {
        let mut packet = vec![0x80, 0x60];
        packet.extend_from_slice(&seq.to_be_bytes());
        packet.extend_from_slice(&[0, 0, 0, 0, 0x12, 0x34, 0x56, 0x78]);
        packet.extend_from_slice(payload);
        Bytes::from(packet)
    }

    fn rtcp_receiver_report(ssrc: u32) -> Bytes {
        let mut packet = vec![0x80, 201, 0x00, 0x01];
        packet.extend_from_slice(&ssrc.to_be_bytes());
        Bytes::from(packet)
    }

    /// producer -> transport -> network, all started
    struct Chain {
        producer: Arc<SinkNode>,
        transport: Arc<SrtpTransport>,
        network: Arc<SinkNode>,
    }

    fn chain() -> Chain {
        let producer = Arc::new(SinkNode::new(NodeType::Rtp));
        let transport = Arc::new(SrtpTransport::new());
        let network = Arc::new(SinkNode::new(NodeType::Ice));
        link(&producer, &transport);
        link(&transport, &network);
        producer.start().unwrap();
        transport.start().unwrap();
        network.start().unwrap();
        Chain {
            producer,
            transport,
            network,
        }
    }

    /// Protect with a sender keyed `local`, return what reached the network
    fn protect_with(local: &[u8], from: NodeType, packet: WirePacket) -> WirePacket {
        let sender = chain();
        sender
            .transport
            .set_key_material(SUITE, local, &key(0xEE))
            .unwrap();
        sender.transport.protect_outbound(from, packet).unwrap();
        sender.network.take().remove(0).packet
    }

    #[test]
    fn test_single_key_roundtrip() {
        let receiver = chain();
        receiver
            .transport
            .set_key_material(SUITE, &key(0xEE), &key(1))
            .unwrap();

        let original = rtp(1, b"hello");
        let protected = protect_with(&key(1), NodeType::Rtp, original.clone().into());
        assert_ne!(protected.payload(), &original);

        receiver
            .transport
            .unprotect_inbound(NodeType::Ice, &protected)
            .unwrap();

        let received = receiver.producer.take();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].direction, Direction::Downstream);
        assert_eq!(received[0].from, NodeType::Srtp);
        assert_eq!(received[0].packet, WirePacket::Untagged(original));

        let stats = receiver.transport.stats();
        assert_eq!(stats.rtp_unprotected, 1);
        assert_eq!(stats.packets_dropped(), 0);
    }

    #[test]
    fn test_rtcp_is_announced_as_srtcp() {
        let receiver = chain();
        receiver
            .transport
            .set_key_material(SUITE, &key(0xEE), &key(1))
            .unwrap();

        let original = rtcp_receiver_report(0xCAFE);
        let protected = protect_with(&key(1), NodeType::Rtcp, original.clone().into());
        receiver
            .transport
            .unprotect_inbound(NodeType::Ice, &protected)
            .unwrap();

        let received = receiver.producer.take();
        assert_eq!(received[0].from, NodeType::Srtcp);
        assert_eq!(received[0].packet.payload(), &original);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let receiver = chain();
        receiver
            .transport
            .set_key_material(SUITE, &key(0xEE), &key(1))
            .unwrap();
        let protected = protect_with(&key(1), NodeType::Rtp, rtp(9, b"data").into());
        let snapshot = protected.payload().to_vec();

        receiver
            .transport
            .unprotect_inbound(NodeType::Ice, &protected)
            .unwrap();
        assert_eq!(protected.payload().as_ref(), &snapshot[..]);
    }

    #[test]
    fn test_not_started() {
        let transport = SrtpTransport::new();
        transport.set_key_material(SUITE, &key(1), &key(2)).unwrap();

        let packet = WirePacket::from(rtp(1, b"x"));
        assert!(matches!(
            transport.protect_outbound(NodeType::Rtp, packet.clone()),
            Err(TransportError::NotStarted(NodeState::Uninitialized))
        ));
        assert!(matches!(
            transport.unprotect_inbound(NodeType::Ice, &packet),
            Err(TransportError::NotStarted(NodeState::Uninitialized))
        ));
        assert_eq!(transport.stats().dropped_not_started, 2);
    }

    #[test]
    fn test_short_packets_rejected() {
        let c = chain();
        c.transport.set_key_material(SUITE, &key(1), &key(2)).unwrap();

        for len in 0..MIN_PACKET_SIZE {
            let packet = WirePacket::from(Bytes::from(vec![0x80; len]));
            assert!(matches!(
                c.transport.unprotect_inbound(NodeType::Ice, &packet),
                Err(TransportError::MalformedPacket { len: l }) if l == len
            ));
            assert!(matches!(
                c.transport.protect_outbound(NodeType::Rtp, packet),
                Err(TransportError::MalformedPacket { .. })
            ));
        }
        assert!(c.producer.is_empty());
        assert!(c.network.is_empty());
    }

    #[test]
    fn test_no_sessions() {
        let c = chain();
        let packet = WirePacket::from(rtp(1, b"x"));
        assert!(matches!(
            c.transport.protect_outbound(NodeType::Rtp, packet.clone()),
            Err(TransportError::NoSession(SessionRole::Send))
        ));
        assert!(matches!(
            c.transport.unprotect_inbound(NodeType::Ice, &packet),
            Err(TransportError::NoSession(SessionRole::Receive))
        ));
    }

    #[test]
    fn test_unsupported_outbound_type() {
        let c = chain();
        c.transport.set_key_material(SUITE, &key(1), &key(2)).unwrap();
        assert!(matches!(
            c.transport.protect_outbound(NodeType::Dtls, rtp(1, b"x").into()),
            Err(TransportError::UnsupportedNodeType(NodeType::Dtls))
        ));
        assert!(c.network.is_empty());
        assert_eq!(c.transport.stats().dropped_unsupported, 1);
    }

    #[test]
    fn test_tampered_packet_dropped() {
        let receiver = chain();
        receiver
            .transport
            .set_key_material(SUITE, &key(0xEE), &key(1))
            .unwrap();
        let protected = protect_with(&key(1), NodeType::Rtp, rtp(1, b"payload").into());

        let mut bytes = protected.payload().to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let tampered = WirePacket::from(Bytes::from(bytes));

        assert!(matches!(
            receiver.transport.unprotect_inbound(NodeType::Ice, &tampered),
            Err(TransportError::CryptoFailure(_))
        ));
        assert!(receiver.producer.is_empty());

        // The genuine packet still goes through
        receiver
            .transport
            .unprotect_inbound(NodeType::Ice, &protected)
            .unwrap();
        assert_eq!(receiver.producer.len(), 1);
    }

    #[test]
    fn test_second_set_key_material_fails() {
        let receiver = chain();
        receiver
            .transport
            .set_key_material(SUITE, &key(0xEE), &key(1))
            .unwrap();
        assert!(matches!(
            receiver
                .transport
                .set_key_material(SUITE, &key(0xEF), &key(2)),
            Err(TransportError::DuplicateKeying(KeySlot::SingleKey))
        ));

        let protected = protect_with(&key(1), NodeType::Rtp, rtp(1, b"first").into());
        receiver
            .transport
            .unprotect_inbound(NodeType::Ice, &protected)
            .unwrap();
    }

    #[test]
    fn test_bad_key_leaves_node_unkeyed() {
        let transport = SrtpTransport::new();
        assert!(matches!(
            transport.set_key_material(SUITE, &key(1), &[0u8; 3]),
            Err(TransportError::SessionSetup(_))
        ));
        assert!(!transport.has_single_key());
        transport.set_key_material(SUITE, &key(1), &key(2)).unwrap();
        assert!(transport.has_single_key());

        assert!(matches!(
            transport.add_channel_key_material(ChannelId::new(0), SUITE, &[1, 2]),
            Err(TransportError::SessionSetup(_))
        ));
        assert_eq!(transport.channel_count(), 0);
    }

    #[test]
    fn test_channel_folding() {
        let transport = SrtpTransport::new();
        transport
            .add_channel_key_material(ChannelId::new(5), SUITE, &key(1))
            .unwrap();
        assert!(matches!(
            transport.add_channel_key_material(ChannelId::new(4), SUITE, &key(2)),
            Err(TransportError::DuplicateKeying(KeySlot::Channel(c))) if c == ChannelId::new(4)
        ));
        transport
            .add_channel_key_material(ChannelId::new(2), SUITE, &key(3))
            .unwrap();
        assert_eq!(transport.channels(), vec![ChannelId::new(2), ChannelId::new(4)]);
    }

    #[test]
    fn test_channel_routing_and_retag() {
        let receiver = chain();
        receiver
            .transport
            .add_channel_key_material(ChannelId::new(2), SUITE, &key(2))
            .unwrap();
        receiver
            .transport
            .add_channel_key_material(ChannelId::new(4), SUITE, &key(4))
            .unwrap();

        let original = rtp(1, b"channel four");
        let protected = protect_with(
            &key(4),
            NodeType::Rtp,
            WirePacket::ChannelTagged(ChannelId::new(4), original.clone()),
        );
        assert_eq!(protected.channel(), Some(ChannelId::new(4)));

        receiver
            .transport
            .unprotect_inbound(NodeType::Ice, &protected)
            .unwrap();
        let received = receiver.producer.take();
        assert_eq!(
            received[0].packet,
            WirePacket::ChannelTagged(ChannelId::new(4), original)
        );

        // Same ciphertext on channel 2 hits a different key
        let misrouted = WirePacket::ChannelTagged(ChannelId::new(2), protected.payload().clone());
        assert!(matches!(
            receiver.transport.unprotect_inbound(NodeType::Ice, &misrouted),
            Err(TransportError::CryptoFailure(_))
        ));
    }

    #[test]
    fn test_unknown_and_untagged_channels() {
        let c = chain();
        c.transport
            .add_channel_key_material(ChannelId::new(0), SUITE, &key(1))
            .unwrap();

        let tagged = WirePacket::ChannelTagged(ChannelId::new(3), rtp(1, b"x"));
        assert!(matches!(
            c.transport.unprotect_inbound(NodeType::Ice, &tagged),
            Err(TransportError::UnknownChannel(ch)) if ch == ChannelId::new(3)
        ));

        let untagged = WirePacket::from(rtp(1, b"x"));
        assert!(matches!(
            c.transport.unprotect_inbound(NodeType::Ice, &untagged),
            Err(TransportError::NoSession(SessionRole::Channel))
        ));

        let stats = c.transport.stats();
        assert_eq!(stats.dropped_unknown_channel, 1);
        assert_eq!(stats.dropped_no_session, 1);
    }

    #[test]
    fn test_channels_take_precedence_over_single_key() {
        let receiver = chain();
        receiver
            .transport
            .set_key_material(SUITE, &key(0xEE), &key(1))
            .unwrap();
        receiver
            .transport
            .add_channel_key_material(ChannelId::new(0), SUITE, &key(7))
            .unwrap();

        // Keyed for the single receive session, which is no longer consulted
        let single = protect_with(&key(1), NodeType::Rtp, rtp(1, b"x").into());
        assert!(matches!(
            receiver.transport.unprotect_inbound(NodeType::Ice, &single),
            Err(TransportError::NoSession(SessionRole::Channel))
        ));

        let on_channel = protect_with(
            &key(7),
            NodeType::Rtp,
            WirePacket::ChannelTagged(ChannelId::new(0), rtp(1, b"x")),
        );
        receiver
            .transport
            .unprotect_inbound(NodeType::Ice, &on_channel)
            .unwrap();
    }

    #[test]
    fn test_stop_releases_everything() {
        let c = chain();
        c.transport.set_key_material(SUITE, &key(1), &key(2)).unwrap();
        c.transport
            .add_channel_key_material(ChannelId::new(0), SUITE, &key(3))
            .unwrap();

        c.transport.stop().unwrap();
        assert_eq!(c.transport.state(), NodeState::Stopped);
        assert!(!c.transport.has_single_key());
        assert_eq!(c.transport.channel_count(), 0);
        c.transport.stop().unwrap();

        let packet = WirePacket::from(rtp(1, b"x"));
        assert!(matches!(
            c.transport.protect_outbound(NodeType::Rtp, packet.clone()),
            Err(TransportError::NotStarted(NodeState::Stopped))
        ));
        assert!(matches!(
            c.transport.unprotect_inbound(NodeType::Ice, &packet),
            Err(TransportError::NotStarted(NodeState::Stopped))
        ));
        assert!(matches!(
            c.transport.set_key_material(SUITE, &key(1), &key(2)),
            Err(TransportError::NotStarted(NodeState::Stopped))
        ));
    }

    #[test]
    fn test_stop_without_sessions() {
        let transport = SrtpTransport::new();
        transport.stop().unwrap();
        transport.stop().unwrap();
        assert_eq!(transport.state(), NodeState::Stopped);
    }

    #[test]
    fn test_node_trait_wraps_errors() {
        let c = chain();
        let packet = WirePacket::from(rtp(1, b"x"));
        let err = c
            .transport
            .on_data_from_downstream(NodeType::Ice, &packet)
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::Rejected {
                node: NodeType::Srtp,
                ..
            }
        ));
        assert_eq!(err.to_string(), "SRTP node rejected the packet: No receive session");
    }

    #[test]
    fn test_forward_failure_reported() {
        let transport = SrtpTransport::new();
        transport.start().unwrap();
        transport.set_key_material(SUITE, &key(1), &key(2)).unwrap();
        assert!(matches!(
            transport.protect_outbound(NodeType::Rtp, rtp(1, b"x").into()),
            Err(TransportError::Forward(NodeError::NotLinked(Direction::Downstream)))
        ));
        let stats = transport.stats();
        assert_eq!(stats.dropped_forward, 1);
        assert_eq!(stats.packets_protected(), 0);
        assert_eq!(stats.bytes_protected, 0);
    }

    #[test]
    fn test_inbound_forward_failure_not_counted_as_unprotected() {
        let protected = protect_with(&key(1), NodeType::Rtp, rtp(1, b"payload").into());

        // No consumer linked upstream
        let receiver = SrtpTransport::new();
        receiver.start().unwrap();
        receiver.set_key_material(SUITE, &key(2), &key(1)).unwrap();
        assert!(matches!(
            receiver.unprotect_inbound(NodeType::Ice, &protected),
            Err(TransportError::Forward(NodeError::NotLinked(Direction::Upstream)))
        ));

        let stats = receiver.stats();
        assert_eq!(stats.dropped_forward, 1);
        assert_eq!(stats.packets_unprotected(), 0);
        assert_eq!(stats.bytes_unprotected, 0);
    }
}
