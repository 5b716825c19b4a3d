//! chatstore CLI entry point.
//!
//! Binary name: `chatstore`
//!
//! Parses CLI arguments, sets up tracing, opens both storage tiers, then
//! dispatches to the command handler. Ctrl+C cancels the running command.

mod cli;
mod state;

use anyhow::anyhow;
use clap::Parser;
use clap_complete::generate;
use chatstore_observe::tracing_setup::{init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,chatstore_core=debug,chatstore_infra=debug",
        _ => "trace",
    };
    init_tracing(filter, cli.otel).map_err(|e| anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "chatstore", &mut std::io::stdout());
        return Ok(());
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init().await?;
    let json = cli.json;

    tokio::select! {
        result = cli::dispatch(cli.command, &state, json) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, in-flight tier calls dropped");
            Err(anyhow!("interrupted"))
        }
    }
}
