//! Welcome banner for chat sessions.

use std::path::Path;

use console::style;

pub fn print_welcome_banner(handle: &str, description: &str, data_dir: &Path) {
    println!();
    println!("  {}", style(handle).cyan().bold());
    if !description.is_empty() {
        println!("  {}", style(description).dim());
    }
    println!();
    println!(
        "  {}  {}",
        style("Config:").bold(),
        style(data_dir.join("config.toml").display()).dim()
    );
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
