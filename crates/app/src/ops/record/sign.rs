use std::path::PathBuf;

use clap::{Args, ValueEnum};

use common::config::CoreConfig;
use common::error::CryptoError;
use common::naming::{
    derive_registry_naming_keypair, derive_vault_naming_keypair, NamingKeypair,
};

use crate::op::RootKeyError;
use crate::state::{AppState, StateError};

/// Which derived naming key signs
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Vault,
    Registry,
}

/// Sign a record pointing one of the derived addresses at a value
#[derive(Args, Debug, Clone)]
pub struct Sign {
    #[arg(long, value_enum, default_value_t = Target::Vault)]
    pub target: Target,

    /// Value the record resolves to, e.g. /ipfs/<cid>
    #[arg(long)]
    pub value: String,

    #[arg(long)]
    pub sequence: u64,

    /// Where to write the marshaled record
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error(transparent)]
    RootKey(#[from] RootKeyError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("signing failed: {0}")]
    Crypto(#[from] CryptoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Sign {
    type Error = SignError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = match AppState::load(ctx.config_path.clone()) {
            Ok(state) => state.config,
            Err(StateError::NotInitialized) => CoreConfig::default(),
            Err(e) => return Err(e.into()),
        };

        let mut root = ctx.root_key()?;
        let derived: Result<NamingKeypair, CryptoError> = match self.target {
            Target::Vault => derive_vault_naming_keypair(&root),
            Target::Registry => derive_registry_naming_keypair(&root),
        };
        root.clear();
        let mut naming = derived?;

        let signed = naming.sign_record(self.value.as_str(), self.sequence, &config.record_options());
        let address = *naming.address();
        naming.clear();
        let marshaled = signed?.marshal();

        tokio::fs::write(&self.output, &marshaled).await?;
        tracing::debug!(%address, sequence = self.sequence, "signed record");
        Ok(format!(
            "Signed record for /ipns/{} (sequence {}, {} bytes) into {}",
            address,
            self.sequence,
            marshaled.len(),
            self.output.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Op, OpContext};
    use crate::ops::record::inspect::{Inspect, InspectError};
    use common::crypto::RootSecretKey;

    #[tokio::test]
    async fn test_sign_then_inspect() {
        let tmp = tempfile::tempdir().unwrap();
        let root = RootSecretKey::generate();
        let address = *derive_vault_naming_keypair(&root).unwrap().address();
        let ctx = OpContext::new(
            Some(tmp.path().join("absent")),
            Some(root.to_hex().as_str().to_string()),
        );
        let file = tmp.path().join("record.bin");

        Sign {
            target: Target::Vault,
            value: "/ipfs/bafkreigh2akiscaildcqabsyg3dfr6chu3fgpregiymsck7e7aqa4s52zy".to_string(),
            sequence: 3,
            output: file.clone(),
        }
        .execute(&ctx)
        .await
        .unwrap();

        let report = Inspect {
            file: file.clone(),
            address: Some(address.to_string()),
            last_seen: Some(2),
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert!(report.contains("Sequence: 3"));
        assert!(report.contains("Verified: yes"));

        let replay = Inspect {
            file,
            address: Some(address.to_string()),
            last_seen: Some(3),
        }
        .execute(&ctx)
        .await;
        assert!(matches!(
            replay,
            Err(InspectError::Rejected(CryptoError::VerificationFailed))
        ));
    }
}
