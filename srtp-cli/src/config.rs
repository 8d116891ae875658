//! Configuration file support for SRTP CLI tools

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use srtp_crypto::CryptoSuite;
use srtp_pipeline::ChannelId;
use std::fs;
use std::path::Path;

/// Single-key mode keys, base64 of master key || master salt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleKeyConfig {
    /// Key protecting what this side sends
    pub local_key: String,
    /// Key the peer protects with
    pub remote_key: String,
}

/// One interleaved channel pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelKeyConfig {
    /// RTP channel; the RTCP channel is the next odd id
    pub channel: u8,
    /// base64 of master key || master salt
    pub key: String,
    /// Suite override for this channel
    pub suite: Option<String>,
}

/// Synthetic traffic for `srtp-loopback`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopbackConfig {
    /// RTP packets per stream
    #[serde(default = "default_packets")]
    pub packets: u32,
    /// RTP payload size
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,
    /// Send an RTCP sender report after every N RTP packets (0 disables)
    #[serde(default = "default_rtcp_interval")]
    pub rtcp_interval: u32,
    /// First RTP sequence number
    #[serde(default)]
    pub initial_seq: u16,
}

fn default_packets() -> u32 {
    500
}

fn default_payload_size() -> usize {
    1200
}

fn default_rtcp_interval() -> u32 {
    50
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        LoopbackConfig {
            packets: default_packets(),
            payload_size: default_payload_size(),
            rtcp_interval: default_rtcp_interval(),
            initial_seq: 0,
        }
    }
}

fn default_suite() -> String {
    CryptoSuite::AesCm128HmacSha1_80.name().to_string()
}

/// Combined configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SDES suite name, e.g. AES_CM_128_HMAC_SHA1_80
    #[serde(default = "default_suite")]
    pub suite: String,
    /// Single-key mode
    pub single: Option<SingleKeyConfig>,
    /// Multiplexed mode
    #[serde(default)]
    pub channels: Vec<ChannelKeyConfig>,
    #[serde(default)]
    pub loopback: LoopbackConfig,
}

/// Keys decoded and checked against their suites
#[derive(Debug, Clone)]
pub struct ResolvedKeys {
    pub suite: CryptoSuite,
    /// (local, remote)
    pub single: Option<(Vec<u8>, Vec<u8>)>,
    pub channels: Vec<ResolvedChannel>,
}

#[derive(Debug, Clone)]
pub struct ResolvedChannel {
    pub channel: ChannelId,
    pub suite: CryptoSuite,
    pub key: Vec<u8>,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Example single-key configuration; the local key is the RFC 3711 B.3 test vector
    pub fn example_single() -> Self {
        Config {
            suite: default_suite(),
            single: Some(SingleKeyConfig {
                local_key: "4fl6DT4Bi+DWT6MsBt5BOQ7Gda1Jiv7rtpYLOqvm".to_string(),
                remote_key: "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwd".to_string(),
            }),
            channels: Vec::new(),
            loopback: LoopbackConfig::default(),
        }
    }

    /// Example multiplexed configuration with two channel pairs
    pub fn example_channels() -> Self {
        Config {
            suite: default_suite(),
            single: None,
            channels: vec![
                ChannelKeyConfig {
                    channel: 0,
                    key: "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwd".to_string(),
                    suite: None,
                },
                ChannelKeyConfig {
                    channel: 2,
                    key: "ICEiIyQlJicoKSorLC0uLzAxMjM0NTY3ODk6Ozw9Pj9AQUJDREVGR0hJSks=".to_string(),
                    suite: Some(CryptoSuite::AeadAes256Gcm.name().to_string()),
                },
            ],
            loopback: LoopbackConfig::default(),
        }
    }

    /// Parsed default suite
    pub fn crypto_suite(&self) -> Result<CryptoSuite, ConfigError> {
        parse_suite(&self.suite)
    }

    /// Decode every key and check it fits its suite
    pub fn resolve(&self) -> Result<ResolvedKeys, ConfigError> {
        let suite = self.crypto_suite()?;

        if self.single.is_none() && self.channels.is_empty() {
            return Err(ConfigError::Invalid(
                "configure [single] keys or at least one [[channels]] entry".to_string(),
            ));
        }
        if self.loopback.payload_size + 64 > srtp_pipeline::MAX_FRAME_PAYLOAD {
            return Err(ConfigError::Invalid(format!(
                "payload_size {} does not fit an interleaved frame",
                self.loopback.payload_size
            )));
        }

        let single = match &self.single {
            Some(single) => Some((
                decode_key("single.local_key", &single.local_key, suite)?,
                decode_key("single.remote_key", &single.remote_key, suite)?,
            )),
            None => None,
        };

        let mut channels: Vec<ResolvedChannel> = Vec::with_capacity(self.channels.len());
        for entry in &self.channels {
            let channel = ChannelId::new(entry.channel);
            if channel.is_rtcp() {
                return Err(ConfigError::Invalid(format!(
                    "channel {} is an RTCP channel; configure its RTP pair {}",
                    channel,
                    channel.rtp_channel()
                )));
            }
            if channels.iter().any(|c| c.channel == channel) {
                return Err(ConfigError::Invalid(format!(
                    "channel {} configured twice",
                    channel
                )));
            }

            let suite = match &entry.suite {
                Some(name) => parse_suite(name)?,
                None => suite,
            };
            let field = format!("channels[{}].key", channel);
            channels.push(ResolvedChannel {
                channel,
                suite,
                key: decode_key(&field, &entry.key, suite)?,
            });
        }

        Ok(ResolvedKeys {
            suite,
            single,
            channels,
        })
    }

    /// Check the configuration without keeping the decoded keys
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolve().map(|_| ())
    }
}

fn parse_suite(name: &str) -> Result<CryptoSuite, ConfigError> {
    name.parse()
        .map_err(|_| ConfigError::Invalid(format!("unknown crypto suite {}", name)))
}

fn decode_key(field: &str, encoded: &str, suite: CryptoSuite) -> Result<Vec<u8>, ConfigError> {
    let key = STANDARD
        .decode(encoded.trim())
        .map_err(|source| ConfigError::Base64 {
            field: field.to_string(),
            source,
        })?;
    if key.len() != suite.key_material_len() {
        return Err(ConfigError::Invalid(format!(
            "{} is {} bytes, {} needs {}",
            field,
            key.len(),
            suite,
            suite.key_material_len()
        )));
    }
    Ok(key)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid base64 in {field}: {source}")]
    Base64 {
        field: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
