//! `mergebots bots`: list registered bots.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use mergebots_core::router::{Candidate, render_candidates};

use crate::state::AppState;

/// Print every registered bot in registration order.
pub fn list_bots(state: &AppState, json: bool) -> Result<()> {
    let bots: Vec<Candidate> = state
        .registry
        .list()
        .into_iter()
        .map(|bot| Candidate {
            name: bot.handle.clone(),
            description: bot.profile.description().unwrap_or_default().to_string(),
        })
        .collect();

    if json {
        println!("{}", render_candidates(&bots)?);
        return Ok(());
    }

    let router_default = &state.config.router.default_handle;

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Handle").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);

    for bot in &bots {
        let name = if &bot.name == router_default {
            Cell::new(format!("{} (default)", bot.name)).fg(Color::Green)
        } else {
            Cell::new(&bot.name).fg(Color::Cyan)
        };
        table.add_row(vec![name, Cell::new(&bot.description)]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} bot{}",
        style(bots.len()).bold(),
        if bots.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}
