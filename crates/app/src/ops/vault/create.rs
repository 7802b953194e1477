use std::path::PathBuf;

use clap::Args;

use common::crypto::RootPublicKey;
use common::error::CryptoError;
use common::metadata::FolderMetadata;
use common::vault::VaultKeys;

use crate::op::RootKeyError;
use crate::state::{AppState, StateError};

/// Generate vault keys and store them wrapped for the owner
#[derive(Args, Debug, Clone)]
pub struct Create {
    /// Owner's root public key (hex); defaults to the public half of --root-key
    #[arg(long)]
    pub owner: Option<String>,

    /// Replace an existing vault file
    #[arg(long)]
    pub force: bool,

    /// Also write the encrypted, empty root listing as a JSON envelope
    #[arg(long)]
    pub export_root: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error(transparent)]
    RootKey(#[from] RootKeyError),
    #[error("invalid owner public key")]
    InvalidOwner,
    #[error("a vault already exists at {0}; pass --force to replace it")]
    Exists(String),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Create {
    type Error = CreateError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        if state.has_vault() && !self.force {
            return Err(CreateError::Exists(state.vault_path.display().to_string()));
        }

        let owner = match &self.owner {
            Some(hex) => RootPublicKey::from_hex(hex.trim()).map_err(|_| CreateError::InvalidOwner)?,
            None => {
                let mut root = ctx.root_key()?;
                let public = root.public();
                root.clear();
                public
            }
        };

        let mut keys = VaultKeys::generate();
        let wrapped = keys.wrap_for(&owner)?;
        let address = *keys.address();
        let envelope = self
            .export_root
            .as_ref()
            .map(|_| state.config.encoding.encrypt(&FolderMetadata::new(), keys.folder_key()))
            .transpose();
        keys.clear();
        let envelope = envelope?;
        state.save_vault(&wrapped)?;
        tracing::info!(%address, "wrote vault keys");

        let mut report = format!(
            "Created vault\n- Root folder address: /ipns/{}\n- Keys: {}",
            address,
            state.vault_path.display()
        );
        if let (Some(path), Some(envelope)) = (&self.export_root, envelope) {
            std::fs::write(path, envelope.to_json()?)?;
            report.push_str(&format!("\n- Root listing: {}", path.display()));
        }
        Ok(report)
    }
}
