//! ChatSurface trait definition.

use std::future::Future;
use std::sync::Arc;

use mergebots_core::presence::PresenceIndicator;

/// One channel of a chat platform, as seen by [`ChatBridge`](super::ChatBridge).
///
/// Uses RPITIT for `send`. Implementations handle the platform wire
/// protocol; the bridge only hands them text that already fits
/// `max_message_len`.
pub trait ChatSurface: Send + Sync {
    type Presence: PresenceIndicator;

    /// Typing indicator for this channel.
    fn presence(&self) -> Arc<Self::Presence>;

    /// Deliver one piece of text to the channel.
    fn send(&self, text: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
}
