//! MergeBots terminal entry point.
//!
//! Binary name: `mergebots`
//!
//! Parses CLI arguments, loads configuration, registers the demo bots and
//! dispatches to the chosen command.

mod cli;
mod demo;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,mergebots=debug",
        _ => "trace",
    };
    mergebots_observe::tracing_setup::init_tracing(directive, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "mergebots", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await;

    let result = match cli.command {
        Commands::Chat { bot } => {
            let handle = bot.unwrap_or_else(|| demo::ROUTER_HANDLE.to_string());
            cli::chat::run_chat_loop(&state, &handle).await
        }
        Commands::Bots => cli::bots::list_bots(&state, cli.json),
        Commands::Completions { .. } => unreachable!("handled above"),
    };

    mergebots_observe::tracing_setup::shutdown_tracing();
    result
}
