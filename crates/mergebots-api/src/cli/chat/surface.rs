//! The terminal as a chat surface.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use mergebots_core::presence::PresenceIndicator;
use mergebots_infra::adapter::ChatSurface;

/// Spinner shown while a bot is working on its next message.
#[derive(Debug)]
pub struct SpinnerPresence {
    message: String,
}

impl SpinnerPresence {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Clears the spinner when dropped.
pub struct SpinnerGuard(ProgressBar);

impl Drop for SpinnerGuard {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}

impl PresenceIndicator for SpinnerPresence {
    type Guard = SpinnerGuard;

    fn start(&self) -> Self::Guard {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(self.message.clone());
        spinner.enable_steady_tick(Duration::from_millis(80));
        SpinnerGuard(spinner)
    }
}

/// Prints delivered messages above the prompt.
pub struct TerminalSurface<W> {
    out: W,
    presence: Arc<SpinnerPresence>,
}

impl<W> TerminalSurface<W>
where
    W: Write + Clone + Send + Sync,
{
    pub fn new(out: W, presence: SpinnerPresence) -> Self {
        Self {
            out,
            presence: Arc::new(presence),
        }
    }
}

impl<W> ChatSurface for TerminalSurface<W>
where
    W: Write + Clone + Send + Sync,
{
    type Presence = SpinnerPresence;

    fn presence(&self) -> Arc<Self::Presence> {
        Arc::clone(&self.presence)
    }

    fn send(&self, text: &str) -> impl Future<Output = anyhow::Result<()>> + Send {
        let mut out = self.out.clone();
        let written = writeln!(out, "{} {text}\n", style("›").cyan().bold())
            .and_then(|()| out.flush())
            .map_err(anyhow::Error::from);
        async move { written }
    }
}
