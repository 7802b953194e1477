use clap::Args;

use common::error::CryptoError;
use common::naming::{
    derive_file_naming_keypair, derive_registry_naming_keypair, derive_vault_naming_keypair,
};

use crate::op::RootKeyError;

/// Print the naming addresses re-derivable from the root identity
#[derive(Args, Debug, Clone)]
pub struct Name {
    /// Also derive the address of the file with this id
    #[arg(long)]
    pub file_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NameError {
    #[error(transparent)]
    RootKey(#[from] RootKeyError),
    #[error("derivation failed: {0}")]
    Crypto(#[from] CryptoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Name {
    type Error = NameError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut root = ctx.root_key()?;
        let vault = derive_vault_naming_keypair(&root);
        let registry = derive_registry_naming_keypair(&root);
        let file = self
            .file_id
            .as_deref()
            .map(|id| derive_file_naming_keypair(&root, id))
            .transpose();
        root.clear();

        let mut lines = vec![
            format!("Vault: /ipns/{}", vault?.address()),
            format!("Registry: /ipns/{}", registry?.address()),
        ];
        if let (Some(id), Some(file)) = (&self.file_id, file?) {
            lines.push(format!("File {}: /ipns/{}", id, file.address()));
        }
        Ok(lines.join("\n"))
    }
}
