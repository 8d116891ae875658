//! SRTP Session
//!
//! A session is bound to one master key/salt and one wildcard SSRC policy.
//! Every SSRC it sees gets its own stream state: the RTP rollover counter and
//! highest sequence number, the SRTCP index, and replay windows. Stream state
//! is only committed once a packet has been transformed successfully, so a
//! rejected packet never advances it.

use crate::cipher::{new_cipher, Cipher};
use crate::error::{CryptoError, Result};
use crate::kdf::derive_session_keys;
use crate::replay::{ReplayCheck, ReplayWindow};
use crate::rtp;
use crate::suite::CryptoSuite;
use bytes::BytesMut;
use std::collections::HashMap;
use std::fmt;

/// Highest SRTCP index (31 bits)
pub const MAX_SRTCP_INDEX: u32 = 0x7FFF_FFFF;

/// Which direction a session serves, for any SSRC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsrcPolicy {
    /// Unprotects packets received from the peer
    AnyInbound,
    /// Protects packets sent to the peer
    AnyOutbound,
}

impl SsrcPolicy {
    pub fn name(self) -> &'static str {
        match self {
            SsrcPolicy::AnyInbound => "inbound",
            SsrcPolicy::AnyOutbound => "outbound",
        }
    }
}

/// Per-SSRC SRTP state
#[derive(Debug, Clone, Default)]
struct RtpStream {
    roc: u32,
    highest_seq: Option<u16>,
    replay: ReplayWindow,
}

impl RtpStream {
    /// Estimate the rollover counter for `seq` (RFC 3711 Appendix A)
    ///
    /// Returns the guessed ROC and the 48-bit packet index.
    fn estimate(&self, ssrc: u32, seq: u16) -> Result<(u32, u64)> {
        let roc = match self.highest_seq {
            None => self.roc,
            Some(s_l) if s_l < 0x8000 => {
                if seq > s_l && seq - s_l > 0x8000 {
                    self.roc.checked_sub(1).ok_or(CryptoError::ReplayTooOld {
                        ssrc,
                        index: u64::from(seq),
                    })?
                } else {
                    self.roc
                }
            }
            Some(s_l) => {
                if seq < s_l - 0x8000 {
                    self.roc
                        .checked_add(1)
                        .ok_or(CryptoError::IndexExhausted(ssrc))?
                } else {
                    self.roc
                }
            }
        };
        Ok((roc, (u64::from(roc) << 16) | u64::from(seq)))
    }

    fn check_replay(&self, ssrc: u32, index: u64) -> Result<()> {
        match self.replay.check(index) {
            ReplayCheck::Fresh => Ok(()),
            ReplayCheck::Duplicate => Err(CryptoError::ReplayDuplicate { ssrc, index }),
            ReplayCheck::TooOld => Err(CryptoError::ReplayTooOld { ssrc, index }),
        }
    }

    fn commit(&mut self, roc: u32, seq: u16, index: u64) {
        let advanced = self
            .replay
            .highest()
            .map_or(true, |highest| index > highest);
        if advanced {
            self.roc = roc;
            self.highest_seq = Some(seq);
        }
        self.replay.accept(index);
    }
}

/// Per-SSRC SRTCP state
#[derive(Debug, Clone, Default)]
struct RtcpStream {
    next_index: u32,
    replay: ReplayWindow,
}

/// Cryptographic context for one direction of a media session
pub struct SrtpSession {
    suite: CryptoSuite,
    policy: SsrcPolicy,
    cipher: Option<Box<dyn Cipher>>,
    rtp_streams: HashMap<u32, RtpStream>,
    rtcp_streams: HashMap<u32, RtcpStream>,
}

impl SrtpSession {
    /// Create a session from concatenated master key and master salt
    pub fn new(policy: SsrcPolicy, suite: CryptoSuite, key_material: &[u8]) -> Result<Self> {
        if key_material.len() != suite.key_material_len() {
            return Err(CryptoError::InvalidKeyLength {
                expected: suite.key_material_len(),
                actual: key_material.len(),
            });
        }

        let (master_key, master_salt) = key_material.split_at(suite.master_key_len());
        let rtp_keys = derive_session_keys(suite, master_key, master_salt, false)?;
        let rtcp_keys = derive_session_keys(suite, master_key, master_salt, true)?;

        Ok(SrtpSession {
            suite,
            policy,
            cipher: Some(new_cipher(suite, &rtp_keys, &rtcp_keys)?),
            rtp_streams: HashMap::new(),
            rtcp_streams: HashMap::new(),
        })
    }

    pub fn suite(&self) -> CryptoSuite {
        self.suite
    }

    pub fn policy(&self) -> SsrcPolicy {
        self.policy
    }

    pub fn is_released(&self) -> bool {
        self.cipher.is_none()
    }

    /// Number of SSRCs with SRTP state
    pub fn rtp_stream_count(&self) -> usize {
        self.rtp_streams.len()
    }

    /// Rollover counter of an SRTP stream
    pub fn rollover_counter(&self, ssrc: u32) -> Option<u32> {
        self.rtp_streams.get(&ssrc).map(|stream| stream.roc)
    }

    fn cipher_for(&self, needed: SsrcPolicy) -> Result<&dyn Cipher> {
        let cipher = self.cipher.as_deref().ok_or(CryptoError::Released)?;
        if self.policy != needed {
            return Err(CryptoError::WrongDirection(self.policy.name()));
        }
        Ok(cipher)
    }

    /// Protect an RTP packet in place
    pub fn protect_rtp(&mut self, packet: &mut BytesMut) -> Result<()> {
        let cipher = self.cipher_for(SsrcPolicy::AnyOutbound)?;
        let header_len = rtp::rtp_header_len(packet)?;
        let seq = rtp::rtp_sequence(packet);
        let ssrc = rtp::rtp_ssrc(packet);

        let mut stream = self.rtp_streams.get(&ssrc).cloned().unwrap_or_default();
        let (roc, index) = stream.estimate(ssrc, seq)?;
        // Reusing an index would reuse keystream
        stream.check_replay(ssrc, index)?;

        cipher.encrypt_rtp(packet, header_len, ssrc, roc, seq)?;
        stream.commit(roc, seq, index);
        self.rtp_streams.insert(ssrc, stream);
        Ok(())
    }

    /// Protect an RTCP packet in place
    pub fn protect_rtcp(&mut self, packet: &mut BytesMut) -> Result<()> {
        let cipher = self.cipher_for(SsrcPolicy::AnyOutbound)?;
        let ssrc = rtp::rtcp_ssrc(packet)?;

        let mut stream = self.rtcp_streams.get(&ssrc).cloned().unwrap_or_default();
        let index = stream.next_index;
        if index > MAX_SRTCP_INDEX {
            return Err(CryptoError::IndexExhausted(ssrc));
        }

        cipher.encrypt_rtcp(packet, index, ssrc)?;
        stream.next_index = index + 1;
        self.rtcp_streams.insert(ssrc, stream);
        Ok(())
    }

    /// Verify and decrypt an SRTP packet in place
    pub fn unprotect_rtp(&mut self, packet: &mut BytesMut) -> Result<()> {
        let cipher = self.cipher_for(SsrcPolicy::AnyInbound)?;
        let header_len = rtp::rtp_header_len(packet)?;
        let seq = rtp::rtp_sequence(packet);
        let ssrc = rtp::rtp_ssrc(packet);

        let mut stream = self.rtp_streams.get(&ssrc).cloned().unwrap_or_default();
        let (roc, index) = stream.estimate(ssrc, seq)?;
        stream.check_replay(ssrc, index)?;

        cipher.decrypt_rtp(packet, header_len, ssrc, roc, seq)?;
        stream.commit(roc, seq, index);
        self.rtp_streams.insert(ssrc, stream);
        Ok(())
    }

    /// Verify and decrypt an SRTCP packet in place
    pub fn unprotect_rtcp(&mut self, packet: &mut BytesMut) -> Result<()> {
        let cipher = self.cipher_for(SsrcPolicy::AnyInbound)?;
        let ssrc = rtp::rtcp_ssrc(packet)?;
        let (index, encrypted) = cipher.rtcp_index(packet)?;

        let mut stream = self.rtcp_streams.get(&ssrc).cloned().unwrap_or_default();
        match stream.replay.check(u64::from(index)) {
            ReplayCheck::Fresh => {}
            ReplayCheck::Duplicate => {
                return Err(CryptoError::ReplayDuplicate {
                    ssrc,
                    index: u64::from(index),
                })
            }
            ReplayCheck::TooOld => {
                return Err(CryptoError::ReplayTooOld {
                    ssrc,
                    index: u64::from(index),
                })
            }
        }

        cipher.decrypt_rtcp(packet, index, encrypted, ssrc)?;
        stream.replay.accept(u64::from(index));
        self.rtcp_streams.insert(ssrc, stream);
        Ok(())
    }

    /// Drop keys and stream state; later calls fail with `Released`
    pub fn release(&mut self) {
        self.cipher = None;
        self.rtp_streams.clear();
        self.rtcp_streams.clear();
    }
}

impl fmt::Debug for SrtpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrtpSession")
            .field("suite", &self.suite)
            .field("policy", &self.policy)
            .field("released", &self.is_released())
            .field("rtp_streams", &self.rtp_streams.len())
            .field("rtcp_streams", &self.rtcp_streams.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_material(suite: CryptoSuite, seed: u8) -> Vec<u8> {
        (0..suite.key_material_len())
            .map(|i| seed.wrapping_add(i as u8))
            .collect()
    }

    fn pair(suite: CryptoSuite) -> (SrtpSession, SrtpSession) {
        let key = key_material(suite, 1);
        (
            SrtpSession::new(SsrcPolicy::AnyOutbound, suite, &key).unwrap(),
            SrtpSession::new(SsrcPolicy::AnyInbound, suite, &key).unwrap(),
        )
    }

    fn rtp_packet(seq: u16, ssrc: u32, payload: &[u8]) -> BytesMut {
        let mut packet = BytesMut::new();
        packet.extend_from_slice(&[0x80, 0x60]);
        packet.extend_from_slice(&seq.to_be_bytes());
        packet.extend_from_slice(&1000u32.to_be_bytes());
        packet.extend_from_slice(&ssrc.to_be_bytes());
        packet.extend_from_slice(payload);
        packet
    }

    fn rtcp_packet(ssrc: u32) -> BytesMut {
        let mut packet = BytesMut::new();
        packet.extend_from_slice(&[0x80, 200, 0x00, 0x06]);
        packet.extend_from_slice(&ssrc.to_be_bytes());
        packet.extend_from_slice(&[0x11; 20]);
        packet
    }

    #[test]
    fn test_rtp_roundtrip_all_suites() {
        for suite in CryptoSuite::ALL {
            let (mut tx, mut rx) = pair(suite);
            let original = rtp_packet(1, 0xAABB_CCDD, b"media payload");
            let mut packet = original.clone();

            tx.protect_rtp(&mut packet).unwrap();
            assert_eq!(packet.len(), original.len() + suite.rtp_auth_tag_len());
            assert_eq!(&packet[..12], &original[..12]);
            assert_ne!(&packet[12..original.len()], &original[12..]);

            rx.unprotect_rtp(&mut packet).unwrap();
            assert_eq!(packet, original, "suite {}", suite);
        }
    }

    #[test]
    fn test_rtcp_roundtrip_all_suites() {
        for suite in CryptoSuite::ALL {
            let (mut tx, mut rx) = pair(suite);
            let original = rtcp_packet(0x0102_0304);
            let mut packet = original.clone();

            tx.protect_rtcp(&mut packet).unwrap();
            assert_eq!(packet.len(), original.len() + 4 + suite.rtcp_auth_tag_len());
            assert_eq!(packet[1], 200);

            rx.unprotect_rtcp(&mut packet).unwrap();
            assert_eq!(packet, original, "suite {}", suite);
        }
    }

    #[test]
    fn test_tampered_packet_rejected() {
        let (mut tx, mut rx) = pair(CryptoSuite::AesCm128HmacSha1_80);
        let mut packet = rtp_packet(7, 1, b"payload");
        tx.protect_rtp(&mut packet).unwrap();
        packet[14] ^= 0x01;

        assert_eq!(
            rx.unprotect_rtp(&mut packet),
            Err(CryptoError::AuthenticationFailed)
        );
        assert_eq!(rx.rtp_stream_count(), 0);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let suite = CryptoSuite::AeadAes128Gcm;
        let mut tx =
            SrtpSession::new(SsrcPolicy::AnyOutbound, suite, &key_material(suite, 1)).unwrap();
        let mut rx =
            SrtpSession::new(SsrcPolicy::AnyInbound, suite, &key_material(suite, 2)).unwrap();

        let mut packet = rtp_packet(1, 1, b"payload");
        tx.protect_rtp(&mut packet).unwrap();
        assert_eq!(
            rx.unprotect_rtp(&mut packet),
            Err(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_replay_rejected() {
        let (mut tx, mut rx) = pair(CryptoSuite::AesCm128HmacSha1_80);
        let mut packet = rtp_packet(10, 5, b"payload");
        tx.protect_rtp(&mut packet).unwrap();

        let mut first = packet.clone();
        rx.unprotect_rtp(&mut first).unwrap();

        let mut again = packet.clone();
        assert_eq!(
            rx.unprotect_rtp(&mut again),
            Err(CryptoError::ReplayDuplicate { ssrc: 5, index: 10 })
        );
    }

    #[test]
    fn test_srtcp_replay_rejected() {
        let (mut tx, mut rx) = pair(CryptoSuite::AeadAes256Gcm);
        let mut packet = rtcp_packet(9);
        tx.protect_rtcp(&mut packet).unwrap();

        let mut first = packet.clone();
        rx.unprotect_rtcp(&mut first).unwrap();
        let mut again = packet.clone();
        assert!(matches!(
            rx.unprotect_rtcp(&mut again),
            Err(CryptoError::ReplayDuplicate { ssrc: 9, .. })
        ));
    }

    #[test]
    fn test_sender_refuses_index_reuse() {
        let (mut tx, _) = pair(CryptoSuite::AesCm128HmacSha1_32);
        tx.protect_rtp(&mut rtp_packet(3, 1, b"a")).unwrap();
        assert!(matches!(
            tx.protect_rtp(&mut rtp_packet(3, 1, b"b")),
            Err(CryptoError::ReplayDuplicate { .. })
        ));
    }

    #[test]
    fn test_rollover_across_wrap() {
        let (mut tx, mut rx) = pair(CryptoSuite::AesCm128HmacSha1_80);
        for seq in [0xFFFEu16, 0xFFFF, 0x0000, 0x0001] {
            let original = rtp_packet(seq, 42, b"wrap");
            let mut packet = original.clone();
            tx.protect_rtp(&mut packet).unwrap();
            rx.unprotect_rtp(&mut packet).unwrap();
            assert_eq!(packet, original);
        }
        assert_eq!(tx.rollover_counter(42), Some(1));
        assert_eq!(rx.rollover_counter(42), Some(1));
    }

    #[test]
    fn test_streams_are_independent() {
        let (mut tx, mut rx) = pair(CryptoSuite::AesCm128HmacSha1_80);
        for ssrc in [1u32, 2, 3] {
            let mut packet = rtp_packet(100, ssrc, b"x");
            tx.protect_rtp(&mut packet).unwrap();
            rx.unprotect_rtp(&mut packet).unwrap();
        }
        assert_eq!(rx.rtp_stream_count(), 3);
    }

    #[test]
    fn test_direction_enforced() {
        let (mut tx, mut rx) = pair(CryptoSuite::AesCm128HmacSha1_80);
        assert_eq!(
            rx.protect_rtp(&mut rtp_packet(1, 1, b"x")),
            Err(CryptoError::WrongDirection("inbound"))
        );
        assert_eq!(
            tx.unprotect_rtcp(&mut rtcp_packet(1)),
            Err(CryptoError::WrongDirection("outbound"))
        );
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mut tx, _) = pair(CryptoSuite::AesCm128HmacSha1_80);
        tx.protect_rtp(&mut rtp_packet(1, 1, b"x")).unwrap();
        tx.release();
        tx.release();
        assert!(tx.is_released());
        assert_eq!(tx.rtp_stream_count(), 0);
        assert_eq!(
            tx.protect_rtp(&mut rtp_packet(2, 1, b"x")),
            Err(CryptoError::Released)
        );
    }

    #[test]
    fn test_key_length_checked() {
        let err = SrtpSession::new(
            SsrcPolicy::AnyInbound,
            CryptoSuite::AesCm128HmacSha1_80,
            &[0u8; 16],
        )
        .unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 30,
                actual: 16
            }
        );
    }

    #[test]
    fn test_short_packets() {
        let (mut tx, mut rx) = pair(CryptoSuite::AesCm128HmacSha1_80);
        assert!(matches!(
            tx.protect_rtp(&mut BytesMut::from(&[0x80u8, 0x60, 0, 1][..])),
            Err(CryptoError::PacketTooShort { .. })
        ));
        // Valid header but no room for the tag
        assert!(matches!(
            rx.unprotect_rtp(&mut rtp_packet(1, 1, b"")),
            Err(CryptoError::PacketTooShort { .. })
        ));
        assert!(matches!(
            rx.unprotect_rtcp(&mut BytesMut::from(&[0x80u8, 200, 0, 1, 0, 0, 0, 1][..])),
            Err(CryptoError::PacketTooShort { .. })
        ));
    }
}
