use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::encoding::DEFAULT_BASE64_CHUNK;
use crate::crypto::Secret;
use crate::error::CryptoError;
use crate::metadata::{Document, EncryptedDocument};
use crate::naming::{RecordOptions, DEFAULT_LIFETIME, DEFAULT_TTL, MAX_RECORD_SIZE};

/// Default cooldown between external signer prompts
pub const DEFAULT_SIGNER_INTERVAL_MS: u64 = 5_000;

/// Tunables for the core
///
/// Every field has a default, so an empty TOML document is a valid config.
///
/// ```toml
/// [record]
/// lifetime_secs = 86400
/// ttl_secs = 300
/// max_size = 10240
///
/// [signer]
/// min_interval_ms = 5000
///
/// [encoding]
/// base64_chunk_size = 32768
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub record: RecordConfig,
    #[serde(default)]
    pub signer: SignerConfig,
    #[serde(default)]
    pub encoding: EncodingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Validity window of newly signed records
    #[serde(default = "default_lifetime_secs")]
    pub lifetime_secs: u64,
    /// Resolver cache hint
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Largest marshaled record a consumer accepts
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

fn default_lifetime_secs() -> u64 {
    DEFAULT_LIFETIME.as_secs()
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_max_size() -> usize {
    MAX_RECORD_SIZE
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: default_lifetime_secs(),
            ttl_secs: default_ttl_secs(),
            max_size: default_max_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerConfig {
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_min_interval_ms() -> u64 {
    DEFAULT_SIGNER_INTERVAL_MS
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Input bytes per base64 chunk, a multiple of three
    #[serde(default = "default_base64_chunk_size")]
    pub base64_chunk_size: usize,
}

fn default_base64_chunk_size() -> usize {
    DEFAULT_BASE64_CHUNK
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            base64_chunk_size: default_base64_chunk_size(),
        }
    }
}

impl EncodingConfig {
    /// Encrypt a document into its JSON envelope with the configured chunking
    pub fn encrypt<D: Document>(&self, document: &D, key: &Secret) -> Result<EncryptedDocument, CryptoError> {
        document.encrypt_chunked(key, self.base64_chunk_size)
    }
}

// ~100 years; keeps validity timestamps inside RFC 3339's range
const MAX_LIFETIME_SECS: u64 = 100 * 365 * 24 * 60 * 60;

impl CoreConfig {
    /// Parse and validate a TOML document
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.record.lifetime_secs == 0 || self.record.lifetime_secs > MAX_LIFETIME_SECS {
            return Err(ConfigError::Invalid("record.lifetime_secs"));
        }
        if self.record.max_size == 0 {
            return Err(ConfigError::Invalid("record.max_size"));
        }
        let chunk = self.encoding.base64_chunk_size;
        if chunk == 0 || chunk % 3 != 0 {
            return Err(ConfigError::Invalid("encoding.base64_chunk_size"));
        }
        Ok(())
    }

    pub fn record_options(&self) -> RecordOptions {
        RecordOptions {
            lifetime: Duration::from_secs(self.record.lifetime_secs),
            ttl: Duration::from_secs(self.record.ttl_secs),
            max_size: self.record.max_size,
        }
    }

    pub fn signer_interval(&self) -> Duration {
        Duration::from_millis(self.signer.min_interval_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration value: {0}")]
    Invalid(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
