//! Packet transforms, one per cipher family.
//!
//! A cipher owns the derived SRTP and SRTCP keys of a session and knows the
//! layout of protected packets. Index bookkeeping and replay protection stay
//! in the session.

mod aes_cm;
mod aes_gcm;

use crate::error::Result;
use crate::kdf::SessionKeys;
use crate::suite::CryptoSuite;
use bytes::BytesMut;

pub(crate) use aes_cm::AesCmHmacSha1;
pub(crate) use aes_gcm::AesGcm;

/// E flag of the SRTCP index word
pub(crate) const SRTCP_E_FLAG: u32 = 0x8000_0000;

/// Size of the E flag + SRTCP index word
pub(crate) const SRTCP_INDEX_SIZE: usize = 4;

pub(crate) trait Cipher: Send {
    /// Encrypt the payload after `header_len` and append the tag
    fn encrypt_rtp(
        &self,
        packet: &mut BytesMut,
        header_len: usize,
        ssrc: u32,
        roc: u32,
        seq: u16,
    ) -> Result<()>;

    /// Verify and strip the tag, then decrypt the payload
    fn decrypt_rtp(
        &self,
        packet: &mut BytesMut,
        header_len: usize,
        ssrc: u32,
        roc: u32,
        seq: u16,
    ) -> Result<()>;

    /// Encrypt everything after the fixed header, append E||index and the tag
    fn encrypt_rtcp(&self, packet: &mut BytesMut, index: u32, ssrc: u32) -> Result<()>;

    /// Read the SRTCP index and E flag from a protected packet
    fn rtcp_index(&self, packet: &[u8]) -> Result<(u32, bool)>;

    /// Verify and strip the trailer, then decrypt if `encrypted`
    fn decrypt_rtcp(
        &self,
        packet: &mut BytesMut,
        index: u32,
        encrypted: bool,
        ssrc: u32,
    ) -> Result<()>;
}

pub(crate) fn new_cipher(
    suite: CryptoSuite,
    rtp: &SessionKeys,
    rtcp: &SessionKeys,
) -> Result<Box<dyn Cipher>> {
    if suite.is_aead() {
        Ok(Box::new(AesGcm::new(suite, rtp, rtcp)?))
    } else {
        Ok(Box::new(AesCmHmacSha1::new(suite, rtp, rtcp)))
    }
}
