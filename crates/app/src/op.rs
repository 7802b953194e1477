use std::error::Error;
use std::path::PathBuf;

use common::crypto::RootSecretKey;

#[derive(Debug, thiserror::Error)]
pub enum RootKeyError {
    #[error("no root key given: pass --root-key or set SEALVAULT_ROOT_KEY")]
    Missing,
    #[error("root key is not a valid secp256k1 secret")]
    Invalid,
}

#[derive(Clone)]
pub struct OpContext {
    /// Optional custom state directory (defaults to ~/.sealvault)
    pub config_path: Option<PathBuf>,
    root_key: Option<String>,
}

impl std::fmt::Debug for OpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpContext")
            .field("config_path", &self.config_path)
            .field("root_key", &self.root_key.as_ref().map(|_| ".."))
            .finish()
    }
}

impl OpContext {
    pub fn new(config_path: Option<PathBuf>, root_key: Option<String>) -> Self {
        Self {
            config_path,
            root_key,
        }
    }

    /// Parse the root secret supplied on the command line or environment
    pub fn root_key(&self) -> Result<RootSecretKey, RootKeyError> {
        let hex = self.root_key.as_deref().ok_or(RootKeyError::Missing)?;
        RootSecretKey::from_hex(hex.trim()).map_err(|_| RootKeyError::Invalid)
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
