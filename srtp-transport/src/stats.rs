//! Transport statistics.

use crate::error::ErrorKind;
use srtp_pipeline::PacketKind;

/// Counters kept by a secure transport node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// RTP packets protected
    pub rtp_protected: u64,
    /// RTCP packets protected
    pub rtcp_protected: u64,
    /// Plaintext bytes handed to protect
    pub bytes_protected: u64,
    /// SRTP packets unprotected
    pub rtp_unprotected: u64,
    /// SRTCP packets unprotected
    pub rtcp_unprotected: u64,
    /// Ciphertext bytes handed to unprotect
    pub bytes_unprotected: u64,
    /// Packets arriving before start or after stop
    pub dropped_not_started: u64,
    /// Packets shorter than an RTP/RTCP header
    pub dropped_malformed: u64,
    /// Packets with no session to handle them
    pub dropped_no_session: u64,
    /// Packets tagged with a channel nobody keyed
    pub dropped_unknown_channel: u64,
    /// Packets the crypto layer rejected
    pub dropped_crypto: u64,
    /// Outbound packets with a type other than RTP/RTCP
    pub dropped_unsupported: u64,
    /// Packets the neighbour node refused
    pub dropped_forward: u64,
}

impl TransportStats {
    pub(crate) fn record_protected(&mut self, kind: PacketKind, bytes: usize) {
        match kind {
            PacketKind::Rtp => self.rtp_protected += 1,
            PacketKind::Rtcp => self.rtcp_protected += 1,
        }
        self.bytes_protected += bytes as u64;
    }

    pub(crate) fn record_unprotected(&mut self, kind: PacketKind, bytes: usize) {
        match kind {
            PacketKind::Rtp => self.rtp_unprotected += 1,
            PacketKind::Rtcp => self.rtcp_unprotected += 1,
        }
        self.bytes_unprotected += bytes as u64;
    }

    pub(crate) fn record_drop(&mut self, kind: ErrorKind) {
        match kind {
            ErrorKind::NotStarted => self.dropped_not_started += 1,
            ErrorKind::MalformedPacket => self.dropped_malformed += 1,
            ErrorKind::NoSession => self.dropped_no_session += 1,
            ErrorKind::UnknownChannel => self.dropped_unknown_channel += 1,
            ErrorKind::CryptoFailure => self.dropped_crypto += 1,
            ErrorKind::UnsupportedNodeType => self.dropped_unsupported += 1,
            ErrorKind::Forward => self.dropped_forward += 1,
            // Keying errors are not per-packet
            ErrorKind::DuplicateKeying | ErrorKind::SessionSetup => {}
        }
    }

    /// Packets protected
    pub fn packets_protected(&self) -> u64 {
        self.rtp_protected + self.rtcp_protected
    }

    /// Packets unprotected
    pub fn packets_unprotected(&self) -> u64 {
        self.rtp_unprotected + self.rtcp_unprotected
    }

    /// Packets dropped for any reason
    pub fn packets_dropped(&self) -> u64 {
        self.dropped_not_started
            + self.dropped_malformed
            + self.dropped_no_session
            + self.dropped_unknown_channel
            + self.dropped_crypto
            + self.dropped_unsupported
            + self.dropped_forward
    }

    /// Fraction of inbound attempts that failed (0.0 to 1.0)
    pub fn inbound_drop_rate(&self) -> f64 {
        let dropped = self.dropped_unknown_channel + self.dropped_crypto + self.dropped_malformed;
        let total = self.packets_unprotected() + dropped;
        if total == 0 {
            0.0
        } else {
            dropped as f64 / total as f64
        }
    }
}
