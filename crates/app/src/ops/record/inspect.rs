use std::path::PathBuf;

use clap::Args;

use common::config::CoreConfig;
use common::error::CryptoError;
use common::naming::{NamingAddress, NamingRecord};

use crate::state::{AppState, StateError};

/// Decode a marshaled record and optionally verify it
#[derive(Args, Debug, Clone)]
pub struct Inspect {
    #[arg(long)]
    pub file: PathBuf,

    /// Verify the record against this address
    #[arg(long)]
    pub address: Option<String>,

    /// Highest sequence number already accepted for the address
    #[arg(long, requires = "address")]
    pub last_seen: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("invalid address")]
    InvalidAddress,
    #[error("record rejected: {0}")]
    Rejected(#[from] CryptoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Inspect {
    type Error = InspectError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = match AppState::load(ctx.config_path.clone()) {
            Ok(state) => state.config,
            Err(StateError::NotInitialized) => CoreConfig::default(),
            Err(e) => return Err(e.into()),
        };

        let bytes = tokio::fs::read(&self.file).await?;
        let record = NamingRecord::unmarshal_with_limit(&bytes, config.record.max_size)?;

        let verified = match &self.address {
            Some(text) => {
                let address: NamingAddress =
                    text.parse().map_err(|_| InspectError::InvalidAddress)?;
                record.verify(&address, self.last_seen)?;
                "yes"
            }
            None => "not checked",
        };

        let validity = record
            .validity()
            .map(|at| at.to_string())
            .unwrap_or_else(|| "unparseable".to_string());
        Ok(format!(
            "Value: {}\nSequence: {}\nValid until: {}\nTTL: {}s\n\
             Signatures: v2={} legacy={}\nEmbedded key: {}\nVerified: {}",
            record.value_str().unwrap_or("<binary>"),
            record.sequence(),
            validity,
            record.ttl().as_secs(),
            record.has_signature_v2(),
            record.has_legacy_signature(),
            record.public_key().is_some(),
            verified,
        ))
    }
}
