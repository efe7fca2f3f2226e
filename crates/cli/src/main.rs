use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod execute;

use commands::Commands;

#[derive(Parser)]
#[command(name = "rigger")]
#[command(about = "Run provisioning pipelines assembled from registry-resolved components", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the nearest rigger.json or rigger.yaml)
    #[arg(long, global = true, env = "RIGGER_CONFIG")]
    config: Option<PathBuf>,

    /// Registration document applied before the settings' own registrations
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Log filter used when RIGGER_LOG and RUST_LOG are unset
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub registry: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    if let Err(e) = rigger_utils::tracing::init_with_default(&cli.log) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let globals = GlobalArgs {
        config: cli.config,
        registry: cli.registry,
    };
    cli.command.execute(&globals).await
}
