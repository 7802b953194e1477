use clap::Args;

use common::crypto::RootSecretKey;

/// Generate a random root identity
#[derive(Args, Debug, Clone)]
pub struct Generate;

#[async_trait::async_trait]
impl crate::op::Op for Generate {
    type Error = std::convert::Infallible;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut key = RootSecretKey::generate();
        let public = key.public();
        let output = format!(
            "Root secret: {}\nRoot public: {}\nAccount: {}\n\
             Keep the root secret offline; pass it with --root-key or SEALVAULT_ROOT_KEY.",
            key.to_hex().as_str(),
            public.to_hex(),
            public.account(),
        );
        key.clear();
        Ok(output)
    }
}
