mod args;
mod op;
mod ops;
mod state;
mod version;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Init, Key, Name, Record, Seal, Unseal, Vault, Version};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

command_enum! {
    (Init, Init),
    (Key, Key),
    (Vault, Vault),
    (Name, Name),
    (Seal, Seal),
    (Unseal, Unseal),
    (Record, Record),
    (Version, Version),
}

/// Log to stderr so command output on stdout stays clean
fn init_logging(level: &str) -> anyhow::Result<WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let level: tracing::Level = level.parse().unwrap_or(tracing::Level::WARN);
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).try_init()?;
    Ok(guard)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let guard = match init_logging(&args.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };
    version::report_build_info();

    let ctx = op::OpContext::new(args.config_path, args.root_key);

    // exit() skips destructors, so flush the log writer first
    let result = args.command.execute(&ctx).await;
    drop(guard);
    match result {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
