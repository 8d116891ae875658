//! The few RTP/RTCP header fields SRTP needs.
//!
//! Headers stay in the clear under SRTP/SRTCP, so these work on both
//! plaintext and protected packets.

use crate::error::{CryptoError, Result};

/// Fixed RTP header size
pub const RTP_HEADER_SIZE: usize = 12;

/// Fixed RTCP header size up to and including the sender SSRC
pub const RTCP_HEADER_SIZE: usize = 8;

const RTP_VERSION: u8 = 2;

/// Length of the RTP header including CSRCs and the extension, if any
pub fn rtp_header_len(buf: &[u8]) -> Result<usize> {
    if buf.len() < RTP_HEADER_SIZE {
        return Err(CryptoError::PacketTooShort {
            expected: RTP_HEADER_SIZE,
            actual: buf.len(),
        });
    }
    if buf[0] >> 6 != RTP_VERSION {
        return Err(CryptoError::InvalidHeader("RTP version is not 2"));
    }

    let csrc_count = (buf[0] & 0x0F) as usize;
    let has_extension = buf[0] & 0x10 != 0;

    let mut len = RTP_HEADER_SIZE + 4 * csrc_count;
    if has_extension {
        if buf.len() < len + 4 {
            return Err(CryptoError::InvalidHeader("truncated header extension"));
        }
        let words = u16::from_be_bytes([buf[len + 2], buf[len + 3]]) as usize;
        len += 4 + 4 * words;
    }

    if buf.len() < len {
        return Err(CryptoError::InvalidHeader("header longer than packet"));
    }
    Ok(len)
}

/// RTP sequence number (caller checked the fixed header is present)
pub fn rtp_sequence(buf: &[u8]) -> u16 {
    u16::from_be_bytes([buf[2], buf[3]])
}

/// RTP SSRC (caller checked the fixed header is present)
pub fn rtp_ssrc(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]])
}

/// RTCP sender SSRC
pub fn rtcp_ssrc(buf: &[u8]) -> Result<u32> {
    if buf.len() < RTCP_HEADER_SIZE {
        return Err(CryptoError::PacketTooShort {
            expected: RTCP_HEADER_SIZE,
            actual: buf.len(),
        });
    }
    Ok(u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_header() {
        let mut packet = vec![0x80, 0x60, 0x12, 0x34, 0, 0, 0, 1, 0xDE, 0xAD, 0xBE, 0xEF];
        packet.extend_from_slice(b"payload");
        assert_eq!(rtp_header_len(&packet).unwrap(), 12);
        assert_eq!(rtp_sequence(&packet), 0x1234);
        assert_eq!(rtp_ssrc(&packet), 0xDEAD_BEEF);
    }

    #[test]
    fn test_csrc_and_extension() {
        // Two CSRCs, extension with one word
        let mut packet = vec![0x92, 0x60, 0, 1, 0, 0, 0, 1, 0, 0, 0, 2];
        packet.extend_from_slice(&[0u8; 8]);
        packet.extend_from_slice(&[0xBE, 0xDE, 0x00, 0x01, 1, 2, 3, 4]);
        packet.extend_from_slice(b"xy");
        assert_eq!(rtp_header_len(&packet).unwrap(), 12 + 8 + 8);
    }

    #[test]
    fn test_bad_headers() {
        assert!(matches!(
            rtp_header_len(&[0x80, 0x60, 0, 1]),
            Err(CryptoError::PacketTooShort { .. })
        ));
        assert_eq!(
            rtp_header_len(&[0x40; 12]),
            Err(CryptoError::InvalidHeader("RTP version is not 2"))
        );
        // CSRC count says 15 entries, packet has none
        assert!(rtp_header_len(&[0x8F, 0x60, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0]).is_err());
        assert_eq!(rtcp_ssrc(&[0x80, 200, 0, 6, 0, 0, 0, 9]).unwrap(), 9);
    }
}
