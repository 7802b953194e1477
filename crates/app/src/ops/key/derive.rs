use clap::Args;

use common::config::CoreConfig;
use common::crypto::RootSecretKey;
use common::error::CryptoError;
use common::signer::{BridgeError, LocalSigner, SignerBridge};

use crate::state::{AppState, StateError};

/// Derive a root identity from a wallet key's deterministic signature
///
/// Reproduces what a wallet-backed session derives, for recovery and
/// testing without the wallet itself.
#[derive(Args, Debug, Clone)]
pub struct Derive {
    /// Hex-encoded secp256k1 wallet secret
    #[arg(long, env = "SEALVAULT_WALLET_KEY", hide_env_values = true)]
    pub wallet_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeriveError {
    #[error("invalid wallet key")]
    InvalidWalletKey,
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("derivation failed: {0}")]
    Bridge(#[from] BridgeError<CryptoError>),
}

#[async_trait::async_trait]
impl crate::op::Op for Derive {
    type Error = DeriveError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = match AppState::load(ctx.config_path.clone()) {
            Ok(state) => state.config,
            Err(StateError::NotInitialized) => CoreConfig::default(),
            Err(e) => return Err(e.into()),
        };

        let mut wallet = RootSecretKey::from_hex(self.wallet_key.trim())
            .map_err(|_| DeriveError::InvalidWalletKey)?;
        let signer = LocalSigner::from(&wallet);
        wallet.clear();

        let bridge = SignerBridge::from_config(&config);
        let mut session = bridge.derive(&signer).await?;
        let output = format!(
            "Account: {}\nRoot secret: {}\nRoot public: {}",
            session.account(),
            session.secret().to_hex().as_str(),
            session.public().to_hex(),
        );
        session.clear();
        Ok(output)
    }
}
