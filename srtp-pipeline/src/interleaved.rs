//! Interleaved Framing (RFC 2326 §10.12)
//!
//! When RTP/RTCP rides on the RTSP TCP connection, every packet is framed as
//! `'$' | channel (1 byte) | length (2 bytes, big endian) | payload`. The
//! decoder turns such a byte stream back into channel-tagged wire packets.

use crate::packet::{ChannelId, WirePacket};
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Frame magic byte (`'$'`)
pub const FRAME_MAGIC: u8 = 0x24;

/// Size of the frame header
pub const FRAME_HEADER_SIZE: usize = 4;

/// Largest payload a frame can carry
pub const MAX_FRAME_PAYLOAD: usize = u16::MAX as usize;

/// Interleaved framing errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InterleavedError {
    #[error("Invalid frame magic: expected 0x24, got {0:#04x}")]
    InvalidMagic(u8),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Append one frame to `buf`
pub fn encode_frame(
    channel: ChannelId,
    payload: &[u8],
    buf: &mut BytesMut,
) -> Result<(), InterleavedError> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(InterleavedError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }

    buf.reserve(FRAME_HEADER_SIZE + payload.len());
    buf.put_u8(FRAME_MAGIC);
    buf.put_u8(channel.as_u8());
    buf.put_u16(payload.len() as u16);
    buf.put_slice(payload);
    Ok(())
}

/// Incremental frame decoder
#[derive(Debug, Default)]
pub struct InterleavedDecoder {
    frames_decoded: u64,
}

impl InterleavedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames decoded so far
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Take the next complete frame off the front of `buf`
    ///
    /// Returns `Ok(None)` if `buf` does not hold a whole frame yet; the bytes
    /// are left in place so the caller can append more and retry.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<WirePacket>, InterleavedError> {
        if buf.is_empty() {
            return Ok(None);
        }
        if buf[0] != FRAME_MAGIC {
            return Err(InterleavedError::InvalidMagic(buf[0]));
        }
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let length = u16::from_be_bytes([buf[2], buf[3]]) as usize;
        if buf.len() < FRAME_HEADER_SIZE + length {
            return Ok(None);
        }

        let channel = ChannelId::new(buf[1]);
        buf.advance(FRAME_HEADER_SIZE);
        let payload = buf.split_to(length).freeze();
        self.frames_decoded += 1;

        Ok(Some(WirePacket::ChannelTagged(channel, payload)))
    }
}
