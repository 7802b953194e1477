use clap::{Args, Subcommand};

pub mod create;
pub mod show;

use crate::op::Op;

crate::command_enum! {
    (Create, create::Create),
    (Show, show::Show),
}

pub type VaultCommand = Command;

/// Wrapped vault keys held by this device
#[derive(Args, Debug, Clone)]
pub struct Vault {
    #[command(subcommand)]
    pub command: VaultCommand,
}

#[async_trait::async_trait]
impl Op for Vault {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
