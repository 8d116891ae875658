//! In-process loopback pipeline
//!
//! ```text
//! sender transport(s) -> wire -> receiver transport -> consumer
//! ```
//!
//! In channel mode every sender owns one interleaved channel pair and the
//! wire serializes packets into `$` frames and decodes them again, the way an
//! RTSP-over-TCP connection would carry them.

use crate::config::{LoopbackConfig, ResolvedKeys};
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};
use srtp_pipeline::{
    encode_frame, link, ChannelId, Direction, InterleavedDecoder, InterleavedError, Node, NodeCore,
    NodeError, NodeType, SinkNode, WirePacket,
};
use srtp_transport::{SrtpTransport, TransportError, TransportStats};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use thiserror::Error;

const BASE_SSRC: u32 = 0x5352_5450;
const RTP_PAYLOAD_TYPE: u8 = 96;
const RTCP_SENDER_REPORT: u8 = 200;
const RTP_CLOCK_STEP: u32 = 3000;

/// Loopback errors
#[derive(Error, Debug)]
pub enum LoopbackError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Interleaved framing error: {0}")]
    Interleaved(#[from] InterleavedError),

    #[error("Interleaved wire received an untagged packet")]
    Untagged,

    #[error("No keys configured")]
    NoKeys,
}

struct Framing {
    stream: BytesMut,
    decoder: InterleavedDecoder,
}

/// Bytes carried by the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireStats {
    pub packets: u64,
    pub bytes: u64,
}

/// Network stand-in: hands protected packets to the peer transport
pub struct WireNode {
    core: NodeCore,
    peer: RwLock<Option<Weak<dyn Node>>>,
    framing: Option<Mutex<Framing>>,
    stats: Mutex<WireStats>,
}

impl WireNode {
    /// `interleaved` frames every packet with its channel tag
    pub fn new(interleaved: bool) -> Self {
        WireNode {
            core: NodeCore::new(NodeType::Ice),
            peer: RwLock::new(None),
            framing: interleaved.then(|| {
                Mutex::new(Framing {
                    stream: BytesMut::new(),
                    decoder: InterleavedDecoder::new(),
                })
            }),
            stats: Mutex::new(WireStats::default()),
        }
    }

    /// Node receiving what comes off the wire
    pub fn set_peer<N: Node + 'static>(&self, peer: &Arc<N>) {
        let peer = Arc::downgrade(peer);
        let peer: Weak<dyn Node> = peer;
        *self.peer.write() = Some(peer);
    }

    pub fn stats(&self) -> WireStats {
        *self.stats.lock()
    }

    /// Packets that come out the far end
    fn carry(&self, packet: WirePacket) -> Result<Vec<WirePacket>, LoopbackError> {
        let framing = match &self.framing {
            Some(framing) => framing,
            None => {
                self.count(packet.len());
                return Ok(vec![packet]);
            }
        };

        let channel = packet.channel().ok_or(LoopbackError::Untagged)?;
        let mut framing = framing.lock();
        let Framing { stream, decoder } = &mut *framing;
        let before = stream.len();
        encode_frame(channel, packet.payload(), stream)?;
        self.count(stream.len() - before);

        let mut delivered = Vec::new();
        while let Some(packet) = decoder.decode(stream)? {
            delivered.push(packet);
        }
        Ok(delivered)
    }

    fn count(&self, bytes: usize) {
        let mut stats = self.stats.lock();
        stats.packets += 1;
        stats.bytes += bytes as u64;
    }
}

impl Node for WireNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn on_data_from_upstream(&self, _from: NodeType, packet: WirePacket) -> Result<(), NodeError> {
        if !self.core.is_started() {
            return Err(NodeError::NotStarted(NodeType::Ice));
        }
        let delivered = self
            .carry(packet)
            .map_err(|err| NodeError::rejected(NodeType::Ice, err))?;

        let peer = self
            .peer
            .read()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(NodeError::NotLinked(Direction::Downstream))?;
        for packet in &delivered {
            peer.on_data_from_downstream(NodeType::Ice, packet)?;
        }
        Ok(())
    }

    fn on_data_from_downstream(
        &self,
        _from: NodeType,
        _packet: &WirePacket,
    ) -> Result<(), NodeError> {
        Err(NodeError::NotLinked(Direction::Upstream))
    }
}

/// One sending stream
struct Stream {
    label: String,
    channel: Option<ChannelId>,
    ssrc: u32,
    transport: Arc<SrtpTransport>,
}

/// Outcome of a loopback run
#[derive(Debug, Clone)]
pub struct LoopbackReport {
    pub rtp_sent: u64,
    pub rtcp_sent: u64,
    /// Packets that reached the consumer intact
    pub delivered: u64,
    /// Packets that reached the consumer with the wrong bytes, tag or type
    pub mismatched: u64,
    pub elapsed: Duration,
    pub wire: WireStats,
    pub senders: Vec<(String, TransportStats)>,
    pub receiver: TransportStats,
}

impl LoopbackReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched == 0 && self.delivered == self.rtp_sent + self.rtcp_sent
    }
}

/// The assembled pipeline
pub struct Loopback {
    streams: Vec<Stream>,
    wire: Arc<WireNode>,
    receiver: Arc<SrtpTransport>,
    consumer: Arc<SinkNode>,
    settings: LoopbackConfig,
}

impl Loopback {
    /// Key and wire the pipeline; channel keys take precedence over single keys
    pub fn build(keys: &ResolvedKeys, settings: LoopbackConfig) -> Result<Self, LoopbackError> {
        let interleaved = !keys.channels.is_empty();
        let wire = Arc::new(WireNode::new(interleaved));
        let receiver = Arc::new(SrtpTransport::new());
        let consumer = Arc::new(SinkNode::new(NodeType::Rtp));
        let mut streams = Vec::new();

        if interleaved {
            if keys.single.is_some() {
                tracing::warn!("Both single and channel keys configured, using channels");
            }
            for (idx, entry) in keys.channels.iter().enumerate() {
                let transport = Arc::new(SrtpTransport::new());
                transport.set_key_material(entry.suite, &entry.key, &entry.key)?;
                receiver.add_channel_key_material(entry.channel, entry.suite, &entry.key)?;
                streams.push(Stream {
                    label: format!(
                        "channel {}/{} ({})",
                        entry.channel,
                        entry.channel.rtcp_channel(),
                        entry.suite
                    ),
                    channel: Some(entry.channel),
                    ssrc: BASE_SSRC + idx as u32,
                    transport,
                });
            }
        } else {
            let (local, remote) = keys.single.as_ref().ok_or(LoopbackError::NoKeys)?;
            let transport = Arc::new(SrtpTransport::new());
            transport.set_key_material(keys.suite, local, remote)?;
            receiver.set_key_material(keys.suite, remote, local)?;
            streams.push(Stream {
                label: format!("single key ({})", keys.suite),
                channel: None,
                ssrc: BASE_SSRC,
                transport,
            });
        }

        for stream in &streams {
            link(&stream.transport, &wire);
        }
        wire.set_peer(&receiver);
        link(&consumer, &receiver);

        consumer.start()?;
        receiver.start()?;
        wire.start()?;
        for stream in &streams {
            stream.transport.start()?;
        }

        Ok(Loopback {
            streams,
            wire,
            receiver,
            consumer,
            settings,
        })
    }

    /// Push the configured traffic through and check what arrives
    pub fn run(&self) -> Result<LoopbackReport, LoopbackError> {
        let start = Instant::now();
        let mut expected = Vec::new();
        let mut rtp_sent = 0;
        let mut rtcp_sent = 0;

        for i in 0..self.settings.packets {
            for stream in &self.streams {
                let seq = self.settings.initial_seq.wrapping_add(i as u16);
                let payload = rtp_packet(stream.ssrc, seq, i, self.settings.payload_size);
                let packet = tag(stream.channel, payload.clone());
                stream.transport.on_data_from_upstream(NodeType::Rtp, packet)?;
                expected.push(tag(stream.channel, payload));
                rtp_sent += 1;

                let interval = self.settings.rtcp_interval;
                if interval > 0 && (i + 1) % interval == 0 {
                    let report = sender_report(stream.ssrc, i + 1);
                    let channel = stream.channel.map(ChannelId::rtcp_channel);
                    stream
                        .transport
                        .on_data_from_upstream(NodeType::Rtcp, tag(channel, report.clone()))?;
                    expected.push(tag(channel, report));
                    rtcp_sent += 1;
                }
            }
        }

        let received = self.consumer.take();
        let elapsed = start.elapsed();

        let mut delivered = 0;
        let mut mismatched = 0;
        for (got, want) in received.iter().zip(&expected) {
            let want_type = if want.payload()[1] == RTCP_SENDER_REPORT {
                NodeType::Srtcp
            } else {
                NodeType::Srtp
            };
            if got.packet == *want && got.from == want_type {
                delivered += 1;
            } else {
                mismatched += 1;
            }
        }
        if received.len() > expected.len() {
            mismatched += (received.len() - expected.len()) as u64;
        }

        Ok(LoopbackReport {
            rtp_sent,
            rtcp_sent,
            delivered,
            mismatched,
            elapsed,
            wire: self.wire.stats(),
            senders: self
                .streams
                .iter()
                .map(|stream| (stream.label.clone(), stream.transport.stats()))
                .collect(),
            receiver: self.receiver.stats(),
        })
    }

    /// Stop every node, releasing all sessions
    pub fn stop(&self) -> Result<(), NodeError> {
        for stream in &self.streams {
            stream.transport.stop()?;
        }
        self.wire.stop()?;
        self.receiver.stop()?;
        self.consumer.stop()
    }
}

fn tag(channel: Option<ChannelId>, payload: Bytes) -> WirePacket {
    match channel {
        Some(channel) => WirePacket::ChannelTagged(channel, payload),
        None => WirePacket::Untagged(payload),
    }
}

/// RTP packet, payload type 96, with a payload derived from `counter`
pub fn rtp_packet(ssrc: u32, seq: u16, counter: u32, payload_size: usize) -> Bytes {
    let mut buf = BytesMut::with_capacity(12 + payload_size);
    buf.put_u8(0x80);
    buf.put_u8(RTP_PAYLOAD_TYPE);
    buf.put_u16(seq);
    buf.put_u32(counter.wrapping_mul(RTP_CLOCK_STEP));
    buf.put_u32(ssrc);
    buf.extend((0..payload_size).map(|n| (n as u32 ^ counter) as u8));
    buf.freeze()
}

/// RTCP sender report without report blocks
pub fn sender_report(ssrc: u32, packet_count: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(28);
    buf.put_u8(0x80);
    buf.put_u8(RTCP_SENDER_REPORT);
    buf.put_u16(6);
    buf.put_u32(ssrc);
    buf.put_u64(u64::from(packet_count) << 32);
    buf.put_u32(packet_count.wrapping_mul(RTP_CLOCK_STEP));
    buf.put_u32(packet_count);
    buf.put_u32(packet_count.wrapping_mul(1200));
    buf.freeze()
}
