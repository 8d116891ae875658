//! AES counter mode with HMAC-SHA1 authentication (RFC 3711 §4.1.1, §4.2.1).

use super::{Cipher, SRTCP_E_FLAG, SRTCP_INDEX_SIZE};
use crate::error::{CryptoError, Result};
use crate::kdf::{aes_cm_apply, SessionKeys};
use crate::rtp::RTCP_HEADER_SIZE;
use crate::suite::CryptoSuite;
use bytes::BytesMut;
use ring::hmac;

pub(crate) struct AesCmHmacSha1 {
    rtp_cipher_key: Vec<u8>,
    rtp_salt: Vec<u8>,
    rtp_auth: hmac::Key,
    rtp_tag_len: usize,
    rtcp_cipher_key: Vec<u8>,
    rtcp_salt: Vec<u8>,
    rtcp_auth: hmac::Key,
    rtcp_tag_len: usize,
}

impl AesCmHmacSha1 {
    pub(crate) fn new(suite: CryptoSuite, rtp: &SessionKeys, rtcp: &SessionKeys) -> Self {
        AesCmHmacSha1 {
            rtp_cipher_key: rtp.cipher_key.clone(),
            rtp_salt: rtp.salt.clone(),
            rtp_auth: hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, &rtp.auth_key),
            rtp_tag_len: suite.rtp_auth_tag_len(),
            rtcp_cipher_key: rtcp.cipher_key.clone(),
            rtcp_salt: rtcp.salt.clone(),
            rtcp_auth: hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, &rtcp.auth_key),
            rtcp_tag_len: suite.rtcp_auth_tag_len(),
        }
    }
}

/// IV = (salt << 16) XOR (SSRC << 64) XOR (index << 16), index being 48 bits
fn counter_iv(salt: &[u8], ssrc: u32, index: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[4..8].copy_from_slice(&ssrc.to_be_bytes());
    iv[8..14].copy_from_slice(&index.to_be_bytes()[2..]);
    for (byte, salt) in iv.iter_mut().zip(salt) {
        *byte ^= salt;
    }
    iv
}

fn auth_tag(key: &hmac::Key, data: &[u8], roc: Option<u32>) -> hmac::Tag {
    let mut ctx = hmac::Context::with_key(key);
    ctx.update(data);
    if let Some(roc) = roc {
        ctx.update(&roc.to_be_bytes());
    }
    ctx.sign()
}

/// Compare truncated tags without an early exit
fn tags_match(expected: &[u8], received: &[u8]) -> bool {
    expected.len() == received.len()
        && expected
            .iter()
            .zip(received)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

impl Cipher for AesCmHmacSha1 {
    fn encrypt_rtp(
        &self,
        packet: &mut BytesMut,
        header_len: usize,
        ssrc: u32,
        roc: u32,
        seq: u16,
    ) -> Result<()> {
        let index = (u64::from(roc) << 16) | u64::from(seq);
        let iv = counter_iv(&self.rtp_salt, ssrc, index);
        aes_cm_apply(&self.rtp_cipher_key, &iv, &mut packet[header_len..])?;

        let tag = auth_tag(&self.rtp_auth, &packet[..], Some(roc));
        packet.extend_from_slice(&tag.as_ref()[..self.rtp_tag_len]);
        Ok(())
    }

    fn decrypt_rtp(
        &self,
        packet: &mut BytesMut,
        header_len: usize,
        ssrc: u32,
        roc: u32,
        seq: u16,
    ) -> Result<()> {
        let min = header_len + self.rtp_tag_len;
        if packet.len() < min {
            return Err(CryptoError::PacketTooShort {
                expected: min,
                actual: packet.len(),
            });
        }

        let tag_start = packet.len() - self.rtp_tag_len;
        let expected = auth_tag(&self.rtp_auth, &packet[..tag_start], Some(roc));
        if !tags_match(&expected.as_ref()[..self.rtp_tag_len], &packet[tag_start..]) {
            return Err(CryptoError::AuthenticationFailed);
        }
        packet.truncate(tag_start);

        let index = (u64::from(roc) << 16) | u64::from(seq);
        let iv = counter_iv(&self.rtp_salt, ssrc, index);
        aes_cm_apply(&self.rtp_cipher_key, &iv, &mut packet[header_len..])
    }

    fn encrypt_rtcp(&self, packet: &mut BytesMut, index: u32, ssrc: u32) -> Result<()> {
        let iv = counter_iv(&self.rtcp_salt, ssrc, u64::from(index));
        aes_cm_apply(&self.rtcp_cipher_key, &iv, &mut packet[RTCP_HEADER_SIZE..])?;

        packet.extend_from_slice(&(SRTCP_E_FLAG | index).to_be_bytes());
        let tag = auth_tag(&self.rtcp_auth, &packet[..], None);
        packet.extend_from_slice(&tag.as_ref()[..self.rtcp_tag_len]);
        Ok(())
    }

    fn rtcp_index(&self, packet: &[u8]) -> Result<(u32, bool)> {
        let min = RTCP_HEADER_SIZE + SRTCP_INDEX_SIZE + self.rtcp_tag_len;
        if packet.len() < min {
            return Err(CryptoError::PacketTooShort {
                expected: min,
                actual: packet.len(),
            });
        }

        let at = packet.len() - self.rtcp_tag_len - SRTCP_INDEX_SIZE;
        let word = u32::from_be_bytes([packet[at], packet[at + 1], packet[at + 2], packet[at + 3]]);
        Ok((word & !SRTCP_E_FLAG, word & SRTCP_E_FLAG != 0))
    }

    fn decrypt_rtcp(
        &self,
        packet: &mut BytesMut,
        index: u32,
        encrypted: bool,
        ssrc: u32,
    ) -> Result<()> {
        let tag_start = packet.len() - self.rtcp_tag_len;
        let expected = auth_tag(&self.rtcp_auth, &packet[..tag_start], None);
        if !tags_match(&expected.as_ref()[..self.rtcp_tag_len], &packet[tag_start..]) {
            return Err(CryptoError::AuthenticationFailed);
        }
        packet.truncate(tag_start - SRTCP_INDEX_SIZE);

        if encrypted {
            let iv = counter_iv(&self.rtcp_salt, ssrc, u64::from(index));
            aes_cm_apply(&self.rtcp_cipher_key, &iv, &mut packet[RTCP_HEADER_SIZE..])?;
        }
        Ok(())
    }
}
