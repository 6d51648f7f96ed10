//! Typing/presence coordination for outbound reply sequences.
//!
//! Chat surfaces show an indicator ("bot is typing...") while a bot works.
//! The indicator must cover only the wait for the next message, never the
//! delivery of a message, so a slow surface does not look like a slow bot.

use std::sync::Arc;

use async_stream::stream;
use futures_util::StreamExt;
use tracing::trace;

use crate::fulfillment::MessageStream;

/// Something that can show that a bot is busy.
///
/// `start` turns the indicator on; dropping the returned guard turns it off.
pub trait PresenceIndicator: Send + Sync + 'static {
    type Guard: Send;

    fn start(&self) -> Self::Guard;
}

/// Indicator that shows nothing, for surfaces without a typing status.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPresence;

impl PresenceIndicator for NoPresence {
    type Guard = ();

    fn start(&self) -> Self::Guard {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// No reply sequence is in progress.
    Idle,
    /// Waiting for the next message of a reply sequence.
    Presenting,
    /// The terminal message arrived; the indicator stays off.
    Settled,
}

/// State machine for one outbound reply sequence.
#[derive(Debug, Clone)]
pub struct PresenceCoordinator {
    state: PresenceState,
}

impl PresenceCoordinator {
    pub fn new() -> Self {
        Self {
            state: PresenceState::Idle,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Whether the indicator should be on while waiting for the next message.
    pub fn should_present(&self) -> bool {
        self.state != PresenceState::Settled
    }

    /// Begin waiting for the next message.
    pub fn arm(&mut self) {
        if self.state == PresenceState::Idle {
            self.state = PresenceState::Presenting;
        }
    }

    /// Record a received message. Returns the new state.
    pub fn observe(&mut self, still_typing: bool) -> PresenceState {
        self.state = if still_typing {
            PresenceState::Presenting
        } else {
            PresenceState::Settled
        };
        self.state
    }
}

impl Default for PresenceCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap `messages` so `indicator` is on exactly while the next message is
/// being awaited.
///
/// The indicator is started before each wait and stopped as soon as a message
/// (or the end of the stream) arrives, before the message is handed on. After
/// a terminal message it is not started again.
pub fn with_presence<P>(messages: MessageStream, indicator: Arc<P>) -> MessageStream
where
    P: PresenceIndicator,
{
    Box::pin(stream! {
        let mut messages = messages;
        let mut coordinator = PresenceCoordinator::new();
        coordinator.arm();

        loop {
            let next = if coordinator.should_present() {
                let _guard = indicator.start();
                trace!("presence on");
                messages.next().await
            } else {
                messages.next().await
            };

            let Some(item) = next else { break };
            if let Ok(message) = &item {
                coordinator.observe(message.is_still_typing);
            }
            yield item;
        }
    })
}
