use std::path::PathBuf;

use clap::Args;

use common::metadata::EncryptionMode;

use super::seal::{parse_key, Mode, SealError};

#[derive(Args, Debug, Clone)]
pub struct Unseal {
    /// Hex-encoded 32-byte content key
    #[arg(long)]
    pub key: String,

    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = Mode::Gcm)]
    pub mode: Mode,

    /// Inclusive plaintext byte range to recover, e.g. 4000-4099
    #[arg(long, value_parser = parse_range)]
    pub range: Option<(usize, usize)>,
}

fn parse_range(text: &str) -> Result<(usize, usize), String> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| "expected START-END".to_string())?;
    let start = start.trim().parse().map_err(|_| "invalid range start".to_string())?;
    let end = end.trim().parse().map_err(|_| "invalid range end".to_string())?;
    if start > end {
        return Err("range start is past its end".to_string());
    }
    Ok((start, end))
}

#[async_trait::async_trait]
impl crate::op::Op for Unseal {
    type Error = SealError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut key = parse_key(&self.key)?;
        let sealed = tokio::fs::read(&self.input).await?;

        let mode = EncryptionMode::from(self.mode);
        let iv_size = mode.iv_size();
        if sealed.len() < iv_size {
            key.clear();
            return Err(common::error::CryptoError::DecryptionFailed.into());
        }
        let (iv, ciphertext) = sealed.split_at(iv_size);

        let result = match self.range {
            Some((start, end)) => mode.decrypt_range(ciphertext, &key, iv, start, end),
            None => mode.decrypt(ciphertext, &key, iv),
        };
        key.clear();
        let plaintext = result?;

        tokio::fs::write(&self.output, &plaintext).await?;
        Ok(format!(
            "Recovered {} bytes into {}",
            plaintext.len(),
            self.output.display()
        ))
    }
}
