//! Session key derivation (RFC 3711 §4.3)
//!
//! The PRF is AES in counter mode keyed with the master key. With a key
//! derivation rate of zero the packet index never enters the derivation, so
//! each session key is the keystream for IV = (master salt XOR label) || 0x0000.

use crate::error::{CryptoError, Result};
use crate::suite::CryptoSuite;
use aes::{Aes128, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Length of the PRF salt input; shorter AEAD salts are zero padded
const PRF_SALT_LEN: usize = 14;

/// HMAC-SHA1 authentication key length
pub const AUTH_KEY_LEN: usize = 20;

/// Key derivation labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Label {
    RtpEncryption = 0x00,
    RtpAuthentication = 0x01,
    RtpSalt = 0x02,
    RtcpEncryption = 0x03,
    RtcpAuthentication = 0x04,
    RtcpSalt = 0x05,
}

/// Keys for one direction of one protocol (SRTP or SRTCP)
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub cipher_key: Vec<u8>,
    /// Empty for AEAD suites
    pub auth_key: Vec<u8>,
    pub salt: Vec<u8>,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("cipher_key", &"<redacted>")
            .field("auth_key", &"<redacted>")
            .field("salt_len", &self.salt.len())
            .finish()
    }
}

/// Fill `out` with AES-CM keystream for `key` and `iv`
pub(crate) fn aes_cm_apply(key: &[u8], iv: &[u8; 16], out: &mut [u8]) -> Result<()> {
    match key.len() {
        16 => {
            let mut cipher = Aes128Ctr::new_from_slices(key, iv)
                .map_err(|_| CryptoError::Cipher("invalid AES-128 key"))?;
            cipher.apply_keystream(out);
        }
        32 => {
            let mut cipher = Aes256Ctr::new_from_slices(key, iv)
                .map_err(|_| CryptoError::Cipher("invalid AES-256 key"))?;
            cipher.apply_keystream(out);
        }
        _ => return Err(CryptoError::Cipher("unsupported AES key size")),
    }
    Ok(())
}

/// Derive `len` bytes for `label`
pub fn derive(master_key: &[u8], master_salt: &[u8], label: Label, len: usize) -> Result<Vec<u8>> {
    if master_salt.len() > PRF_SALT_LEN {
        return Err(CryptoError::Cipher("master salt longer than 112 bits"));
    }

    let mut iv = [0u8; 16];
    iv[..master_salt.len()].copy_from_slice(master_salt);
    iv[7] ^= label as u8;

    let mut out = vec![0u8; len];
    aes_cm_apply(master_key, &iv, &mut out)?;
    Ok(out)
}

/// Derive the SRTP (`rtcp == false`) or SRTCP session keys for a suite
pub fn derive_session_keys(
    suite: CryptoSuite,
    master_key: &[u8],
    master_salt: &[u8],
    rtcp: bool,
) -> Result<SessionKeys> {
    let (enc, auth, salt) = if rtcp {
        (Label::RtcpEncryption, Label::RtcpAuthentication, Label::RtcpSalt)
    } else {
        (Label::RtpEncryption, Label::RtpAuthentication, Label::RtpSalt)
    };

    let cipher_key = derive(master_key, master_salt, enc, suite.master_key_len())?;
    let auth_key = if suite.is_aead() {
        Vec::new()
    } else {
        derive(master_key, master_salt, auth, AUTH_KEY_LEN)?
    };
    let salt = derive(master_key, master_salt, salt, suite.master_salt_len())?;

    Ok(SessionKeys {
        cipher_key,
        auth_key,
        salt,
    })
}
