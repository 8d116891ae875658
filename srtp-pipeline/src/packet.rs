//! Wire Packets
//!
//! A wire packet is an opaque RTP/RTCP buffer, optionally tagged with the
//! interleaved channel it arrived on. The tag is decided at the transport
//! boundary, so nodes never have to inspect a buffer to learn where it came
//! from.

use bytes::Bytes;
use std::fmt;

/// Smallest buffer that can hold an RTP or RTCP packet worth inspecting
pub const MIN_PACKET_SIZE: usize = 4;

/// First RTCP packet type of the RFC 5761 demultiplexing range
const RTCP_TYPE_FIRST: u8 = 192;

/// Last RTCP packet type of the RFC 5761 demultiplexing range
const RTCP_TYPE_LAST: u8 = 223;

/// Interleaved channel identifier
///
/// RTP travels on even channels and its RTCP companion on the next odd one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u8);

impl ChannelId {
    pub const fn new(id: u8) -> Self {
        ChannelId(id)
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// The RTP channel of the pair this channel belongs to (low bit cleared)
    pub const fn rtp_channel(self) -> ChannelId {
        ChannelId(self.0 & !1)
    }

    /// The RTCP channel of the pair this channel belongs to (low bit set)
    pub const fn rtcp_channel(self) -> ChannelId {
        ChannelId(self.0 | 1)
    }

    /// Check if this is the RTCP half of a pair
    pub const fn is_rtcp(self) -> bool {
        self.0 & 1 == 1
    }
}

impl From<u8> for ChannelId {
    fn from(id: u8) -> Self {
        ChannelId(id)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Packet flowing between nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WirePacket {
    /// Packet from a transport that carries one stream (UDP, DTLS)
    Untagged(Bytes),
    /// Packet from an interleaved byte stream, with its channel id
    ChannelTagged(ChannelId, Bytes),
}

impl WirePacket {
    /// Get the packet bytes
    pub fn payload(&self) -> &Bytes {
        match self {
            WirePacket::Untagged(payload) => payload,
            WirePacket::ChannelTagged(_, payload) => payload,
        }
    }

    /// Consume the packet, returning its bytes
    pub fn into_payload(self) -> Bytes {
        match self {
            WirePacket::Untagged(payload) => payload,
            WirePacket::ChannelTagged(_, payload) => payload,
        }
    }

    /// Get the channel tag, if any
    pub fn channel(&self) -> Option<ChannelId> {
        match self {
            WirePacket::Untagged(_) => None,
            WirePacket::ChannelTagged(channel, _) => Some(*channel),
        }
    }

    /// Build a packet carrying the same tag as `self` but different bytes
    pub fn with_payload(&self, payload: Bytes) -> WirePacket {
        match self {
            WirePacket::Untagged(_) => WirePacket::Untagged(payload),
            WirePacket::ChannelTagged(channel, _) => WirePacket::ChannelTagged(*channel, payload),
        }
    }

    pub fn len(&self) -> usize {
        self.payload().len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload().is_empty()
    }
}

impl From<Bytes> for WirePacket {
    fn from(payload: Bytes) -> Self {
        WirePacket::Untagged(payload)
    }
}

/// RTP or RTCP, as told apart on a multiplexed port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Rtp,
    Rtcp,
}

impl PacketKind {
    /// Classify a packet by its second octet (RFC 5761 §4)
    ///
    /// Packet types 192..=223 are RTCP, everything else is RTP. The octet is
    /// never encrypted, so this works on SRTP/SRTCP as well as plaintext.
    /// Returns `None` if the buffer is too short to carry the octet.
    pub fn classify(buf: &[u8]) -> Option<PacketKind> {
        buf.get(1).map(|&octet| PacketKind::from_second_octet(octet))
    }

    pub fn from_second_octet(octet: u8) -> PacketKind {
        if (RTCP_TYPE_FIRST..=RTCP_TYPE_LAST).contains(&octet) {
            PacketKind::Rtcp
        } else {
            PacketKind::Rtp
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Rtp => write!(f, "RTP"),
            PacketKind::Rtcp => write!(f, "RTCP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_folding() {
        assert_eq!(ChannelId::new(4).rtp_channel(), ChannelId::new(4));
        assert_eq!(ChannelId::new(5).rtp_channel(), ChannelId::new(4));
        assert_eq!(ChannelId::new(0).rtcp_channel(), ChannelId::new(1));
        assert_eq!(ChannelId::new(255).rtp_channel(), ChannelId::new(254));
        assert!(ChannelId::new(3).is_rtcp());
        assert!(!ChannelId::new(2).is_rtcp());
    }

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(PacketKind::from_second_octet(191), PacketKind::Rtp);
        assert_eq!(PacketKind::from_second_octet(192), PacketKind::Rtcp);
        assert_eq!(PacketKind::from_second_octet(200), PacketKind::Rtcp);
        assert_eq!(PacketKind::from_second_octet(223), PacketKind::Rtcp);
        assert_eq!(PacketKind::from_second_octet(224), PacketKind::Rtp);
        assert_eq!(PacketKind::from_second_octet(96), PacketKind::Rtp);
    }

    #[test]
    fn test_classify_short_buffer() {
        assert_eq!(PacketKind::classify(&[]), None);
        assert_eq!(PacketKind::classify(&[0x80]), None);
        assert_eq!(PacketKind::classify(&[0x80, 0xC8]), Some(PacketKind::Rtcp));
    }

    #[test]
    fn test_with_payload_keeps_tag() {
        let tagged = WirePacket::ChannelTagged(ChannelId::new(3), Bytes::from_static(b"abcd"));
        let replaced = tagged.with_payload(Bytes::from_static(b"efgh"));
        assert_eq!(replaced.channel(), Some(ChannelId::new(3)));
        assert_eq!(replaced.payload().as_ref(), b"efgh");

        let untagged = WirePacket::from(Bytes::from_static(b"abcd"));
        assert_eq!(untagged.with_payload(Bytes::new()).channel(), None);
    }
}
