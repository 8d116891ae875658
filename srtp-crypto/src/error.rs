//! Error types for SRTP operations.

use thiserror::Error;

/// Result type alias for SRTP operations.
pub type Result<T> = core::result::Result<T, CryptoError>;

/// SRTP operation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Unknown crypto suite identifier or name.
    #[error("Unsupported crypto suite: {0}")]
    UnsupportedSuite(String),

    /// Key material length does not match the suite.
    #[error("Invalid key material length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected master key + salt length in bytes.
        expected: usize,
        /// Actual length received in bytes.
        actual: usize,
    },

    /// Packet shorter than its header plus trailer.
    #[error("Packet too short: need at least {expected} bytes, got {actual}")]
    PacketTooShort {
        /// Minimum length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Header fields are inconsistent (version, CSRC count, extension length).
    #[error("Invalid header: {0}")]
    InvalidHeader(&'static str),

    /// Authentication tag mismatch.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Packet index already seen.
    #[error("Replayed packet: ssrc={ssrc:#010x} index={index}")]
    ReplayDuplicate {
        /// Stream the packet belongs to.
        ssrc: u32,
        /// Packet index.
        index: u64,
    },

    /// Packet index fell behind the replay window.
    #[error("Packet too old: ssrc={ssrc:#010x} index={index}")]
    ReplayTooOld {
        /// Stream the packet belongs to.
        ssrc: u32,
        /// Packet index.
        index: u64,
    },

    /// Rollover counter or SRTCP index reached its limit; the key must be replaced.
    #[error("Packet index exhausted for ssrc={0:#010x}")]
    IndexExhausted(u32),

    /// Protect on an inbound session or unprotect on an outbound session.
    #[error("Operation not allowed by the {0} session policy")]
    WrongDirection(&'static str),

    /// Session was released.
    #[error("Session has been released")]
    Released,

    /// Underlying cipher rejected the operation.
    #[error("Cipher error: {0}")]
    Cipher(&'static str),
}
