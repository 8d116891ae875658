//! SRTP protection profiles.

use crate::error::CryptoError;
use std::fmt;
use std::str::FromStr;

/// Negotiated cipher and authentication combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CryptoSuite {
    /// AES-128 counter mode, HMAC-SHA1 with an 80-bit tag (RFC 3711)
    AesCm128HmacSha1_80,
    /// AES-128 counter mode, HMAC-SHA1 with a 32-bit SRTP tag (RFC 3711)
    AesCm128HmacSha1_32,
    /// AES-128 GCM (RFC 7714)
    AeadAes128Gcm,
    /// AES-256 GCM (RFC 7714)
    AeadAes256Gcm,
}

impl CryptoSuite {
    pub const ALL: [CryptoSuite; 4] = [
        CryptoSuite::AesCm128HmacSha1_80,
        CryptoSuite::AesCm128HmacSha1_32,
        CryptoSuite::AeadAes128Gcm,
        CryptoSuite::AeadAes256Gcm,
    ];

    /// DTLS-SRTP protection profile id (RFC 5764, RFC 7714)
    pub fn profile_id(self) -> u16 {
        match self {
            CryptoSuite::AesCm128HmacSha1_80 => 0x0001,
            CryptoSuite::AesCm128HmacSha1_32 => 0x0002,
            CryptoSuite::AeadAes128Gcm => 0x0007,
            CryptoSuite::AeadAes256Gcm => 0x0008,
        }
    }

    /// SDES crypto-suite name (RFC 4568, RFC 7714)
    pub fn name(self) -> &'static str {
        match self {
            CryptoSuite::AesCm128HmacSha1_80 => "AES_CM_128_HMAC_SHA1_80",
            CryptoSuite::AesCm128HmacSha1_32 => "AES_CM_128_HMAC_SHA1_32",
            CryptoSuite::AeadAes128Gcm => "AEAD_AES_128_GCM",
            CryptoSuite::AeadAes256Gcm => "AEAD_AES_256_GCM",
        }
    }

    pub fn master_key_len(self) -> usize {
        match self {
            CryptoSuite::AeadAes256Gcm => 32,
            _ => 16,
        }
    }

    pub fn master_salt_len(self) -> usize {
        if self.is_aead() {
            12
        } else {
            14
        }
    }

    /// Length of the concatenated master key and salt
    pub fn key_material_len(self) -> usize {
        self.master_key_len() + self.master_salt_len()
    }

    /// Authentication tag appended to SRTP packets
    pub fn rtp_auth_tag_len(self) -> usize {
        match self {
            CryptoSuite::AesCm128HmacSha1_80 => 10,
            CryptoSuite::AesCm128HmacSha1_32 => 4,
            CryptoSuite::AeadAes128Gcm | CryptoSuite::AeadAes256Gcm => 16,
        }
    }

    /// Authentication tag appended to SRTCP packets
    ///
    /// SRTCP always uses the 80-bit tag with HMAC-SHA1 (RFC 5764 §4.1.2).
    pub fn rtcp_auth_tag_len(self) -> usize {
        match self {
            CryptoSuite::AesCm128HmacSha1_80 | CryptoSuite::AesCm128HmacSha1_32 => 10,
            CryptoSuite::AeadAes128Gcm | CryptoSuite::AeadAes256Gcm => 16,
        }
    }

    pub fn is_aead(self) -> bool {
        matches!(
            self,
            CryptoSuite::AeadAes128Gcm | CryptoSuite::AeadAes256Gcm
        )
    }
}

impl TryFrom<u64> for CryptoSuite {
    type Error = CryptoError;

    fn try_from(profile_id: u64) -> Result<Self, Self::Error> {
        CryptoSuite::ALL
            .into_iter()
            .find(|suite| u64::from(suite.profile_id()) == profile_id)
            .ok_or_else(|| CryptoError::UnsupportedSuite(format!("{:#06x}", profile_id)))
    }
}

impl FromStr for CryptoSuite {
    type Err = CryptoError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        CryptoSuite::ALL
            .into_iter()
            .find(|suite| suite.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| CryptoError::UnsupportedSuite(name.to_string()))
    }
}

impl fmt::Display for CryptoSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
