use std::path::PathBuf;

use clap::{Args, ValueEnum};

use common::crypto::{encrypt_ctr, generate_ctr_iv, Secret};
use common::error::CryptoError;
use common::metadata::EncryptionMode;

/// Cipher used for content bytes
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// AES-256-GCM, authenticated
    #[default]
    Gcm,
    /// AES-256-CTR, seekable
    Ctr,
}

impl From<Mode> for EncryptionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Gcm => EncryptionMode::Gcm,
            Mode::Ctr => EncryptionMode::Ctr,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("invalid content key")]
    InvalidKey,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Encrypt a file under a content key
///
/// The output is `iv || ciphertext`; in block mode the tag trails the
/// ciphertext.
#[derive(Args, Debug, Clone)]
pub struct Seal {
    /// Hex-encoded 32-byte content key; a fresh one is generated if omitted
    #[arg(long)]
    pub key: Option<String>,

    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = Mode::Gcm)]
    pub mode: Mode,
}

pub(crate) fn parse_key(hex: &str) -> Result<Secret, SealError> {
    Secret::from_hex(hex.trim()).map_err(|_| SealError::InvalidKey)
}

#[async_trait::async_trait]
impl crate::op::Op for Seal {
    type Error = SealError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (mut key, generated) = match &self.key {
            Some(hex) => (parse_key(hex)?, false),
            None => (Secret::generate(), true),
        };

        let plaintext = tokio::fs::read(&self.input).await?;
        let sealed = match self.mode {
            Mode::Gcm => key.seal(&plaintext)?,
            Mode::Ctr => {
                let iv = generate_ctr_iv();
                let ciphertext = encrypt_ctr(&plaintext, &key, &iv)?;
                [iv.as_slice(), ciphertext.as_slice()].concat()
            }
        };
        tokio::fs::write(&self.output, &sealed).await?;
        tracing::debug!(mode = ?self.mode, size = sealed.len(), "sealed file");

        let mut output = format!(
            "Sealed {} bytes into {} ({:?})",
            plaintext.len(),
            self.output.display(),
            EncryptionMode::from(self.mode)
        );
        if generated {
            output.push_str(&format!("\nContent key: {}", hex::encode(key.bytes())));
        }
        key.clear();
        Ok(output)
    }
}
