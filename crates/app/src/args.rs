pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sealvault")]
#[command(about = "Offline key management and sealing for SealVault vaults")]
pub struct Args {
    /// Path to the state directory (defaults to ~/.sealvault)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Hex-encoded root secret; never written to disk
    #[arg(long, global = true, env = "SEALVAULT_ROOT_KEY", hide_env_values = true)]
    pub root_key: Option<String>,

    /// Default log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: crate::Command,
}
