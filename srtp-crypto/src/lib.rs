//! SRTP Encryption
//!
//! This crate provides the per-session cryptographic context used by the
//! secure transport: RFC 3711 key derivation and packet protection with
//! AES-CM/HMAC-SHA1, and RFC 7714 AEAD AES-GCM. Sessions follow a wildcard
//! SSRC policy, tracking rollover and replay state for every stream they see.

pub mod adapter;
mod cipher;
pub mod error;
pub mod kdf;
pub mod replay;
pub mod rtp;
pub mod session;
pub mod suite;

pub use adapter::{CryptoSession, SessionFactory, SrtpSessionFactory};
pub use error::{CryptoError, Result};
pub use replay::ReplayWindow;
pub use session::{SrtpSession, SsrcPolicy};
pub use suite::CryptoSuite;
