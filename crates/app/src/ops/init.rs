use clap::Args;

use common::config::CoreConfig;

use crate::state::{AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Validity window of new naming records, in seconds
    #[arg(long)]
    pub record_lifetime: Option<u64>,

    /// Minimum interval between external signer prompts, in milliseconds
    #[arg(long)]
    pub signer_interval_ms: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = CoreConfig::default();
        if let Some(secs) = self.record_lifetime {
            config.record.lifetime_secs = secs;
        }
        if let Some(ms) = self.signer_interval_ms {
            config.signer.min_interval_ms = ms;
        }

        let state = AppState::init(ctx.config_path.clone(), config)?;
        let device = state.load_device()?;

        Ok(format!(
            "Initialized sealvault directory at: {}\n\
             - Device id: {}\n\
             - Device key: {}\n\
             - Config: {}\n\
             - Record lifetime: {}s",
            state.dir.display(),
            device.id(),
            state.device_path.display(),
            state.config_path.display(),
            state.config.record.lifetime_secs,
        ))
    }
}
