use clap::{Args, Subcommand};

pub mod derive;
pub mod generate;
pub mod public;

use crate::op::Op;

crate::command_enum! {
    (Generate, generate::Generate),
    (Public, public::Public),
    (Derive, derive::Derive),
}

pub type KeyCommand = Command;

/// Root identity management
#[derive(Args, Debug, Clone)]
pub struct Key {
    #[command(subcommand)]
    pub command: KeyCommand,
}

#[async_trait::async_trait]
impl Op for Key {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
