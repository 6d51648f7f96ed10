//! CLI command definitions for the `mergebots` binary.

pub mod bots;
pub mod chat;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Talk to a small team of bots that share one conversation.
#[derive(Parser)]
#[command(name = "mergebots", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed logs (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export spans through OpenTelemetry (stdout).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat in the terminal.
    Chat {
        /// Bot that answers every message (default: RouterBot).
        #[arg(long, short)]
        bot: Option<String>,
    },

    /// List registered bots.
    #[command(alias = "ls")]
    Bots,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_parse_chat_with_bot() {
        let cli = Cli::parse_from(["mergebots", "-vv", "chat", "--bot", "EchoBot"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Chat { bot: Some(ref b) } if b == "EchoBot"));
    }

    #[test]
    fn test_parse_bots_json() {
        let cli = Cli::parse_from(["mergebots", "bots", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Bots));
    }
}
