use clap::Args;

use crate::op::RootKeyError;

/// Print the public half of the root identity
#[derive(Args, Debug, Clone)]
pub struct Public;

#[async_trait::async_trait]
impl crate::op::Op for Public {
    type Error = RootKeyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut key = ctx.root_key()?;
        let public = key.public();
        key.clear();
        Ok(format!(
            "Root public: {}\nAccount: {}",
            public.to_hex(),
            public.account()
        ))
    }
}
