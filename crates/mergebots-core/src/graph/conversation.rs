//! Lazy conversation views over a [`MessageGraph`].

use mergebots_types::config::HistoryPolicy;
use mergebots_types::message::{Message, MessageId, MessageRef};

use super::store::MessageGraph;

/// The conversation ending at one tail message.
///
/// Nothing is materialised until the view is walked, and walking it twice
/// yields the same messages.
#[derive(Clone, Copy)]
pub struct Conversation<'g> {
    graph: &'g MessageGraph,
    tail: MessageId,
}

impl<'g> Conversation<'g> {
    pub(crate) fn new(graph: &'g MessageGraph, tail: MessageId) -> Self {
        Self { graph, tail }
    }

    pub fn tail(&self) -> MessageId {
        self.tail
    }

    /// Walk `previous_msg` links from the tail back to the root, newest first.
    pub fn walk_back(&self) -> WalkBack<'g> {
        WalkBack {
            graph: self.graph,
            next: Some(self.tail),
            // A chain can never be longer than the store it lives in.
            remaining: self.graph.len(),
        }
    }

    /// Messages accepted by `filter`, oldest first.
    pub fn chronological<F>(&self, filter: F) -> Vec<MessageRef>
    where
        F: Fn(&Message) -> bool,
    {
        let mut messages: Vec<MessageRef> = self.walk_back().filter(|m| filter(m)).collect();
        messages.reverse();
        messages
    }

    /// The history a bot is allowed to see under `policy`, oldest first.
    pub fn for_bots(&self, policy: &HistoryPolicy) -> Vec<MessageRef> {
        self.chronological(|m| bot_visible(policy, m))
    }
}

impl std::fmt::Debug for Conversation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("tail", &self.tail)
            .finish()
    }
}

/// Whether a bot rebuilding its history should see `message`.
///
/// With `include_bot_service_messages` every hidden message from a bot
/// participant is shown, including router restart notices and the error
/// reports an adapter records under its own bot identity.
pub fn bot_visible(policy: &HistoryPolicy, message: &Message) -> bool {
    message.is_visible_to_bots
        || (policy.include_bot_service_messages && !message.sender.is_human())
}

/// Newest-first iterator over a `previous_msg` chain.
pub struct WalkBack<'g> {
    graph: &'g MessageGraph,
    next: Option<MessageId>,
    remaining: usize,
}

impl Iterator for WalkBack<'_> {
    type Item = MessageRef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.next.take()?;
        let message = self.graph.get(&id)?;
        self.remaining -= 1;
        self.next = message.previous_msg;
        Some(message)
    }
}
