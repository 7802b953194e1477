use clap::Args;

use common::error::CryptoError;

use crate::op::RootKeyError;
use crate::state::{AppState, StateError};

/// Unwrap the stored vault keys and describe them
#[derive(Args, Debug, Clone)]
pub struct Show;

#[derive(Debug, thiserror::Error)]
pub enum ShowError {
    #[error(transparent)]
    RootKey(#[from] RootKeyError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("cannot unwrap vault keys: {0}")]
    Crypto(#[from] CryptoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Show {
    type Error = ShowError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let wrapped = state.load_vault()?;

        let mut root = ctx.root_key()?;
        let recovered = wrapped.recover(&root);
        root.clear();
        let mut keys = recovered?;
        let naming = keys.naming().public();
        keys.clear();

        Ok(format!(
            "Root folder address: /ipns/{}\nNaming public key: {}",
            wrapped.address(),
            naming.to_hex(),
        ))
    }
}
