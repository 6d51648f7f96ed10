//! Slash commands for the chat loop.

use std::io::Write;

use console::style;

#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    Clear,
    Exit,
    /// Show the current conversation, hidden messages included.
    History,
    /// List the bots the router can choose from.
    Bots,
    Unknown(String),
}

/// Parse user input as a slash command; `None` for ordinary messages.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let cmd = trimmed
        .split_whitespace()
        .next()
        .unwrap_or(trimmed)
        .to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/clear" | "/cls" => Some(ChatCommand::Clear),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        "/history" => Some(ChatCommand::History),
        "/bots" => Some(ChatCommand::Bots),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

pub fn print_help(out: &mut impl Write, restart_prefix: &str) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  {}", style("Available commands:").bold())?;
    writeln!(out)?;
    writeln!(out, "  {}    Show this help message", style("/help").cyan())?;
    writeln!(out, "  {}   Clear the screen", style("/clear").cyan())?;
    writeln!(out, "  {} Show the conversation so far", style("/history").cyan())?;
    writeln!(out, "  {}    List available bots", style("/bots").cyan())?;
    writeln!(out, "  {}    End the chat session", style("/exit").cyan())?;
    writeln!(out)?;
    writeln!(
        out,
        "  {}",
        style(format!(
            "Start a message with {restart_prefix} to begin a new conversation"
        ))
        .dim()
    )?;
    writeln!(out)
}
