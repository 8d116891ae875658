//! Session abstraction used by the transport node.
//!
//! The transport only needs "protect / unprotect / release" from a session and
//! a way to create one. Keeping that behind two small traits lets the node be
//! driven by [`SrtpSession`] in production and by counting doubles in tests.

use crate::error::Result;
use crate::session::{SrtpSession, SsrcPolicy};
use crate::suite::CryptoSuite;
use bytes::BytesMut;

/// One keyed SRTP context
pub trait CryptoSession: Send {
    fn protect_rtp(&mut self, packet: &mut BytesMut) -> Result<()>;
    fn protect_rtcp(&mut self, packet: &mut BytesMut) -> Result<()>;
    fn unprotect_rtp(&mut self, packet: &mut BytesMut) -> Result<()>;
    fn unprotect_rtcp(&mut self, packet: &mut BytesMut) -> Result<()>;

    /// Drop key material; must be safe to call more than once
    fn release(&mut self);
}

/// Creates keyed sessions
pub trait SessionFactory: Send + Sync {
    type Session: CryptoSession;

    fn create(
        &self,
        policy: SsrcPolicy,
        suite: CryptoSuite,
        key_material: &[u8],
    ) -> Result<Self::Session>;
}

impl CryptoSession for SrtpSession {
    fn protect_rtp(&mut self, packet: &mut BytesMut) -> Result<()> {
        SrtpSession::protect_rtp(self, packet)
    }

    fn protect_rtcp(&mut self, packet: &mut BytesMut) -> Result<()> {
        SrtpSession::protect_rtcp(self, packet)
    }

    fn unprotect_rtp(&mut self, packet: &mut BytesMut) -> Result<()> {
        SrtpSession::unprotect_rtp(self, packet)
    }

    fn unprotect_rtcp(&mut self, packet: &mut BytesMut) -> Result<()> {
        SrtpSession::unprotect_rtcp(self, packet)
    }

    fn release(&mut self) {
        SrtpSession::release(self)
    }
}

/// Factory for real [`SrtpSession`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct SrtpSessionFactory;

impl SessionFactory for SrtpSessionFactory {
    type Session = SrtpSession;

    fn create(
        &self,
        policy: SsrcPolicy,
        suite: CryptoSuite,
        key_material: &[u8],
    ) -> Result<SrtpSession> {
        SrtpSession::new(policy, suite, key_material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<F: SessionFactory>(factory: &F, suite: CryptoSuite) {
        let key = vec![0x42u8; suite.key_material_len()];
        let mut tx = factory.create(SsrcPolicy::AnyOutbound, suite, &key).unwrap();
        let mut rx = factory.create(SsrcPolicy::AnyInbound, suite, &key).unwrap();

        let original = BytesMut::from(&[0x80u8, 0x60, 0, 1, 0, 0, 0, 0, 0, 0, 0, 7, 9, 9][..]);
        let mut packet = original.clone();
        tx.protect_rtp(&mut packet).unwrap();
        rx.unprotect_rtp(&mut packet).unwrap();
        assert_eq!(packet, original);

        tx.release();
        tx.release();
    }

    #[test]
    fn test_factory_sessions() {
        for suite in CryptoSuite::ALL {
            roundtrip(&SrtpSessionFactory, suite);
        }
    }

    #[test]
    fn test_factory_rejects_bad_key() {
        let err = SrtpSessionFactory
            .create(SsrcPolicy::AnyInbound, CryptoSuite::AeadAes256Gcm, &[0u8; 30])
            .unwrap_err();
        assert!(matches!(err, crate::CryptoError::InvalidKeyLength { expected: 44, .. }));
    }
}
