//! AEAD AES-GCM for SRTP and SRTCP (RFC 7714).

use super::{Cipher, SRTCP_E_FLAG, SRTCP_INDEX_SIZE};
use crate::error::{CryptoError, Result};
use crate::kdf::SessionKeys;
use crate::rtp::RTCP_HEADER_SIZE;
use crate::suite::CryptoSuite;
use bytes::BytesMut;
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, NONCE_LEN};

const TAG_LEN: usize = 16;

pub(crate) struct AesGcm {
    rtp_key: LessSafeKey,
    rtp_salt: Vec<u8>,
    rtcp_key: LessSafeKey,
    rtcp_salt: Vec<u8>,
}

impl AesGcm {
    pub(crate) fn new(suite: CryptoSuite, rtp: &SessionKeys, rtcp: &SessionKeys) -> Result<Self> {
        let algorithm = match suite {
            CryptoSuite::AeadAes256Gcm => &aead::AES_256_GCM,
            _ => &aead::AES_128_GCM,
        };
        let key = |bytes: &[u8]| {
            UnboundKey::new(algorithm, bytes)
                .map(LessSafeKey::new)
                .map_err(|_| CryptoError::Cipher("invalid AES-GCM key"))
        };

        Ok(AesGcm {
            rtp_key: key(&rtp.cipher_key)?,
            rtp_salt: rtp.salt.clone(),
            rtcp_key: key(&rtcp.cipher_key)?,
            rtcp_salt: rtcp.salt.clone(),
        })
    }
}

fn salted_nonce(mut iv: [u8; NONCE_LEN], salt: &[u8]) -> Nonce {
    for (byte, salt) in iv.iter_mut().zip(salt) {
        *byte ^= salt;
    }
    Nonce::assume_unique_for_key(iv)
}

/// IV = 00 00 || SSRC || ROC || SEQ, XOR salt (RFC 7714 §8.1)
fn rtp_nonce(salt: &[u8], ssrc: u32, roc: u32, seq: u16) -> Nonce {
    let mut iv = [0u8; NONCE_LEN];
    iv[2..6].copy_from_slice(&ssrc.to_be_bytes());
    iv[6..10].copy_from_slice(&roc.to_be_bytes());
    iv[10..12].copy_from_slice(&seq.to_be_bytes());
    salted_nonce(iv, salt)
}

/// IV = 00 00 || SSRC || 00 00 || 0 || SRTCP index, XOR salt (RFC 7714 §9.1)
fn rtcp_nonce(salt: &[u8], ssrc: u32, index: u32) -> Nonce {
    let mut iv = [0u8; NONCE_LEN];
    iv[2..6].copy_from_slice(&ssrc.to_be_bytes());
    iv[8..12].copy_from_slice(&(index & !SRTCP_E_FLAG).to_be_bytes());
    salted_nonce(iv, salt)
}

impl Cipher for AesGcm {
    fn encrypt_rtp(
        &self,
        packet: &mut BytesMut,
        header_len: usize,
        ssrc: u32,
        roc: u32,
        seq: u16,
    ) -> Result<()> {
        let nonce = rtp_nonce(&self.rtp_salt, ssrc, roc, seq);
        let (header, payload) = packet.split_at_mut(header_len);
        let tag = self
            .rtp_key
            .seal_in_place_separate_tag(nonce, Aad::from(&*header), payload)
            .map_err(|_| CryptoError::Cipher("AES-GCM seal failed"))?;
        packet.extend_from_slice(tag.as_ref());
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
        let min = header_len + TAG_LEN;
        if packet.len() < min {
            return Err(CryptoError::PacketTooShort {
                expected: min,
                actual: packet.len(),
            });
        }

        let nonce = rtp_nonce(&self.rtp_salt, ssrc, roc, seq);
        let plain_len = packet.len() - TAG_LEN;
        let (header, body) = packet.split_at_mut(header_len);
        self.rtp_key
            .open_in_place(nonce, Aad::from(&*header), body)
            .map_err(|_| CryptoError::AuthenticationFailed)?;
        packet.truncate(plain_len);
        Ok(())
    }

    fn encrypt_rtcp(&self, packet: &mut BytesMut, index: u32, ssrc: u32) -> Result<()> {
        let e_index = (SRTCP_E_FLAG | index).to_be_bytes();
        let mut aad = [0u8; RTCP_HEADER_SIZE + SRTCP_INDEX_SIZE];
        aad[..RTCP_HEADER_SIZE].copy_from_slice(&packet[..RTCP_HEADER_SIZE]);
        aad[RTCP_HEADER_SIZE..].copy_from_slice(&e_index);

        let nonce = rtcp_nonce(&self.rtcp_salt, ssrc, index);
        let tag = self
            .rtcp_key
            .seal_in_place_separate_tag(nonce, Aad::from(aad), &mut packet[RTCP_HEADER_SIZE..])
            .map_err(|_| CryptoError::Cipher("AES-GCM seal failed"))?;

        packet.extend_from_slice(tag.as_ref());
        packet.extend_from_slice(&e_index);
        Ok(())
    }

    fn rtcp_index(&self, packet: &[u8]) -> Result<(u32, bool)> {
        let min = RTCP_HEADER_SIZE + TAG_LEN + SRTCP_INDEX_SIZE;
        if packet.len() < min {
            return Err(CryptoError::PacketTooShort {
                expected: min,
                actual: packet.len(),
            });
        }

        let at = packet.len() - SRTCP_INDEX_SIZE;
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
        let index_at = packet.len() - SRTCP_INDEX_SIZE;
        let tag_at = index_at - TAG_LEN;
        let mut e_index = [0u8; SRTCP_INDEX_SIZE];
        e_index.copy_from_slice(&packet[index_at..]);

        let nonce = rtcp_nonce(&self.rtcp_salt, ssrc, index);
        if encrypted {
            let mut aad = [0u8; RTCP_HEADER_SIZE + SRTCP_INDEX_SIZE];
            aad[..RTCP_HEADER_SIZE].copy_from_slice(&packet[..RTCP_HEADER_SIZE]);
            aad[RTCP_HEADER_SIZE..].copy_from_slice(&e_index);
            self.rtcp_key
                .open_in_place(nonce, Aad::from(aad), &mut packet[RTCP_HEADER_SIZE..index_at])
                .map_err(|_| CryptoError::AuthenticationFailed)?;
        } else {
            // Unencrypted SRTCP: the whole packet is additional data
            let mut aad = Vec::with_capacity(tag_at + SRTCP_INDEX_SIZE);
            aad.extend_from_slice(&packet[..tag_at]);
            aad.extend_from_slice(&e_index);
            self.rtcp_key
                .open_in_place(nonce, Aad::from(aad), &mut packet[tag_at..index_at])
                .map_err(|_| CryptoError::AuthenticationFailed)?;
        }

        packet.truncate(tag_at);
        Ok(())
    }
}
