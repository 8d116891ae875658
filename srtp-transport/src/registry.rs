//! Channel Session Registry
//!
//! Maps interleaved channels to receive sessions in multiplexed mode. An RTP
//! channel is even and its RTCP companion is the next odd id; both share the
//! session stored under the even id.

use parking_lot::Mutex;
use srtp_crypto::CryptoSession;
use srtp_pipeline::ChannelId;
use std::collections::HashMap;

/// Registry key for a channel: the id with its low bit cleared
pub fn normalize_channel(channel: ChannelId) -> ChannelId {
    channel.rtp_channel()
}

/// Per-channel receive sessions
///
/// Each session sits behind its own mutex so channels never contend with
/// each other on the packet path.
pub struct ChannelSessionRegistry<S> {
    sessions: HashMap<ChannelId, Mutex<S>>,
}

impl<S: CryptoSession> ChannelSessionRegistry<S> {
    pub fn new() -> Self {
        ChannelSessionRegistry {
            sessions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, channel: ChannelId) -> bool {
        self.sessions.contains_key(&normalize_channel(channel))
    }

    /// Insert a session; gives it back if the normalized id is taken
    pub fn insert(&mut self, channel: ChannelId, session: S) -> Result<ChannelId, S> {
        let key = normalize_channel(channel);
        if self.sessions.contains_key(&key) {
            return Err(session);
        }
        self.sessions.insert(key, Mutex::new(session));
        Ok(key)
    }

    /// Session serving `channel` (odd ids fold onto their RTP pair)
    pub fn get(&self, channel: ChannelId) -> Option<&Mutex<S>> {
        self.sessions.get(&normalize_channel(channel))
    }

    /// Normalized ids, ascending
    pub fn channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<_> = self.sessions.keys().copied().collect();
        channels.sort();
        channels
    }

    /// Release every session and empty the registry; returns how many
    pub fn release_all(&mut self) -> usize {
        let count = self.sessions.len();
        for (_, session) in self.sessions.drain() {
            session.into_inner().release();
        }
        count
    }
}

impl<S: CryptoSession> Default for ChannelSessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
