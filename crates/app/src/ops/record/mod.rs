use clap::{Args, Subcommand};

pub mod inspect;
pub mod sign;

use crate::op::Op;

crate::command_enum! {
    (Inspect, inspect::Inspect),
    (Sign, sign::Sign),
}

pub type RecordCommand = Command;

/// Produce and check marshaled naming records
#[derive(Args, Debug, Clone)]
pub struct Record {
    #[command(subcommand)]
    pub command: RecordCommand,
}

#[async_trait::async_trait]
impl Op for Record {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
