//! Main chat loop.

use std::io::Write;

use console::style;
use tracing::{Instrument, info, info_span};

use mergebots_infra::adapter::{ChatBridge, InboundEvent};
use mergebots_observe::attrs;

use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::surface::{SpinnerPresence, TerminalSurface};

/// The terminal is a single channel.
const CHANNEL: &str = "terminal";

/// Chat with `handle` until the user exits.
pub async fn run_chat_loop(state: &AppState, handle: &str) -> anyhow::Result<()> {
    let bot = state.registry.lookup(handle)?;
    print_welcome_banner(
        &bot.handle,
        bot.profile.description().unwrap_or_default(),
        &state.data_dir,
    );

    let bridge = ChatBridge::new(
        state.engine.clone(),
        bot.handle.clone(),
        state.config.adapter.clone(),
    );
    let author = std::env::var("USER").unwrap_or_else(|_| "you".to_string());

    let prompt = format!("{} ", style(">").green().bold());
    let (mut input, mut out) = ChatInput::new(prompt)?;
    let surface = TerminalSurface::new(
        out.clone(),
        SpinnerPresence::new(format!("{} is typing...", bot.handle)),
    );

    loop {
        let text = match input.read_line().await {
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
            InputEvent::Interrupted => {
                writeln!(out, "{}", style("Ctrl+D or /exit to leave").dim())?;
                continue;
            }
            InputEvent::Eof => break,
        };

        if let Some(command) = commands::parse(&text) {
            match command {
                ChatCommand::Help => {
                    commands::print_help(&mut out, &state.config.adapter.restart_prefix)?;
                }
                ChatCommand::Clear => input.clear(),
                ChatCommand::Exit => break,
                ChatCommand::History => print_history(&mut out, &bridge)?,
                ChatCommand::Bots => {
                    for registered in state.registry.list() {
                        writeln!(out, "  {}", style(&registered.handle).cyan())?;
                    }
                }
                ChatCommand::Unknown(cmd) => {
                    writeln!(
                        out,
                        "{} unknown command {cmd}, try /help",
                        style("!").yellow().bold()
                    )?;
                }
            }
            continue;
        }

        let event = InboundEvent {
            channel_id: CHANNEL.to_string(),
            author_id: author.clone(),
            author_name: author.clone(),
            content: text,
        };
        let span = info_span!(
            attrs::INBOUND_SPAN,
            { attrs::CHANNEL_ID } = CHANNEL,
            { attrs::BOT_HANDLE } = bot.handle.as_str()
        );
        let outcome = bridge
            .handle_inbound(event, &surface)
            .instrument(span)
            .await?;
        info!(
            delivered = outcome.delivered.len(),
            failed = outcome.error.is_some(),
            "exchange finished"
        );
    }

    input.finish();
    println!();
    println!("  {}", style("Bye.").dim());
    Ok(())
}

/// Print the conversation ending at the channel tail, hidden messages dimmed.
fn print_history(out: &mut impl Write, bridge: &ChatBridge) -> std::io::Result<()> {
    let Some(tail) = bridge.tail(CHANNEL) else {
        return writeln!(out, "{}", style("Nothing yet.").dim());
    };

    writeln!(out)?;
    for message in bridge.engine().graph().reconstruct(&tail, true) {
        let sender = style(&message.sender.name).bold();
        if message.is_visible_to_bots {
            writeln!(out, "  {sender}: {}", message.content)?;
        } else {
            writeln!(out, "  {sender}: {}", style(&message.content).dim())?;
        }
    }
    writeln!(out)
}
