//! Arena-style message store.
//!
//! Messages are held as `Arc<Message>` in a concurrent map keyed by id. All
//! links between messages are ids, so there is no ownership between nodes and
//! nothing is ever edited or deleted in place.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use mergebots_types::error::GraphError;
use mergebots_types::message::{Message, MessageId, MessageRef, ReplyDraft};
use mergebots_types::participant::{Participant, ParticipantId};

use super::conversation::Conversation;

/// Latest reply appended for a cause.
#[derive(Debug, Clone, Copy)]
struct ReplyTail {
    last: MessageId,
    terminal: bool,
}

/// Append-only store of conversation messages.
///
/// A message can only link to messages that are already stored, which keeps
/// every `previous_msg` chain acyclic.
pub struct MessageGraph {
    messages: DashMap<MessageId, MessageRef>,
    /// cause id -> latest reply to that cause.
    reply_tails: DashMap<MessageId, ReplyTail>,
    /// Every participant that has sent a message through this graph.
    participants: DashMap<ParticipantId, Participant>,
}

impl MessageGraph {
    pub fn new() -> Self {
        Self {
            messages: DashMap::new(),
            reply_tails: DashMap::new(),
            participants: DashMap::new(),
        }
    }

    /// Store an inbound message that is not a reply to anything.
    ///
    /// `previous` is the last message of the conversation so far, or `None` to
    /// start a new thread. The originator is inherited from `previous`; a new
    /// thread is originated by `sender`.
    pub fn post(
        &self,
        sender: &Participant,
        content: impl Into<String>,
        visible_to_bots: bool,
        previous: Option<&Message>,
    ) -> Result<MessageRef, GraphError> {
        let previous_id = match previous {
            Some(prev) => Some(self.require(prev.id)?.id),
            None => None,
        };
        let originator = previous.map(|p| p.originator).unwrap_or(sender.id);

        let message = self.build(
            sender,
            content.into(),
            false,
            visible_to_bots,
            previous_id,
            None,
            originator,
        );
        Ok(self.insert(message))
    }

    /// Store a fresh, visible message that opens a side thread on behalf of
    /// `originator` (used when one bot privately asks another).
    pub fn post_on_behalf(
        &self,
        sender: &Participant,
        content: impl Into<String>,
        originator: ParticipantId,
    ) -> MessageRef {
        let message = self.build(sender, content.into(), false, true, None, None, originator);
        self.insert(message)
    }

    /// Build and link a reply to `cause`.
    ///
    /// The first reply to a cause points back at the cause; later replies
    /// point at the reply before them. Appending after a terminal reply fails
    /// with [`GraphError::TerminalSlotClosed`].
    pub fn append_reply(
        &self,
        cause: &Message,
        sender: &Participant,
        draft: ReplyDraft,
    ) -> Result<MessageRef, GraphError> {
        self.require(cause.id)?;

        // The entry guard serialises concurrent appends to the same cause.
        match self.reply_tails.entry(cause.id) {
            Entry::Occupied(mut tail) => {
                let current = *tail.get();
                if current.terminal {
                    return Err(GraphError::TerminalSlotClosed {
                        cause: cause.id,
                        terminal: current.last,
                    });
                }
                let stored = self.insert_reply(cause, sender, draft, current.last);
                tail.insert(ReplyTail {
                    last: stored.id,
                    terminal: stored.is_terminal(),
                });
                Ok(stored)
            }
            Entry::Vacant(slot) => {
                let stored = self.insert_reply(cause, sender, draft, cause.id);
                slot.insert(ReplyTail {
                    last: stored.id,
                    terminal: stored.is_terminal(),
                });
                Ok(stored)
            }
        }
    }

    /// Rebuild the conversation ending at `tail` in chronological order.
    ///
    /// Hidden messages are dropped unless `include_hidden` is set.
    pub fn reconstruct(&self, tail: &Message, include_hidden: bool) -> Vec<MessageRef> {
        self.conversation(tail)
            .chronological(|m| include_hidden || m.is_visible_to_bots)
    }

    /// A lazy view of the conversation ending at `tail`.
    pub fn conversation(&self, tail: &Message) -> Conversation<'_> {
        Conversation::new(self, tail.id)
    }

    pub fn get(&self, id: &MessageId) -> Option<MessageRef> {
        self.messages.get(id).map(|m| Arc::clone(m.value()))
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.contains_key(id)
    }

    /// Look up a participant that has sent at least one message.
    pub fn participant(&self, id: &ParticipantId) -> Option<Participant> {
        self.participants.get(id).map(|p| p.value().clone())
    }

    /// Whether `cause` already received its terminal reply.
    pub fn is_terminated(&self, cause: &MessageId) -> bool {
        self.reply_tails
            .get(cause)
            .map(|tail| tail.terminal)
            .unwrap_or(false)
    }

    /// Latest reply appended for `cause`, if any.
    pub fn latest_reply(&self, cause: &MessageId) -> Option<MessageRef> {
        let last = self.reply_tails.get(cause).map(|tail| tail.last)?;
        self.get(&last)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn require(&self, id: MessageId) -> Result<MessageRef, GraphError> {
        self.get(&id).ok_or(GraphError::UnknownMessage(id))
    }

    fn insert_reply(
        &self,
        cause: &Message,
        sender: &Participant,
        draft: ReplyDraft,
        previous: MessageId,
    ) -> MessageRef {
        let message = self.build(
            sender,
            draft.content,
            draft.still_typing,
            draft.visible_to_bots,
            Some(previous),
            Some(cause.id),
            cause.originator,
        );
        self.insert(message)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        sender: &Participant,
        content: String,
        is_still_typing: bool,
        is_visible_to_bots: bool,
        previous_msg: Option<MessageId>,
        in_fulfillment_of: Option<MessageId>,
        originator: ParticipantId,
    ) -> Message {
        Message {
            id: MessageId::new(),
            sender: sender.clone(),
            content,
            is_still_typing,
            is_visible_to_bots,
            previous_msg,
            in_fulfillment_of,
            originator,
            created_at: Utc::now(),
        }
    }

    fn insert(&self, message: Message) -> MessageRef {
        self.participants
            .entry(message.sender.id)
            .or_insert_with(|| message.sender.clone());

        let stored = Arc::new(message);
        self.messages.insert(stored.id, Arc::clone(&stored));
        debug!(
            message.id = %stored.id,
            sender = %stored.sender,
            still_typing = stored.is_still_typing,
            visible_to_bots = stored.is_visible_to_bots,
            "stored message"
        );
        stored
    }
}

impl Default for MessageGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageGraph")
            .field("messages", &self.messages.len())
            .field("open_causes", &self.reply_tails.iter().filter(|t| !t.terminal).count())
            .field("participants", &self.participants.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(messages: &[MessageRef]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn post_without_previous_starts_thread() {
        let graph = MessageGraph::new();
        let user = Participant::human("alice");

        let msg = graph.post(&user, "hi", true, None).unwrap();

        assert!(msg.previous_msg.is_none());
        assert!(msg.in_fulfillment_of.is_none());
        assert_eq!(msg.originator, user.id);
        assert!(msg.is_sent_by_originator());
        assert_eq!(graph.participant(&user.id), Some(user));
    }

    #[test]
    fn post_inherits_originator_from_previous() {
        let graph = MessageGraph::new();
        let alice = Participant::human("alice");
        let bob = Participant::human("bob");

        let first = graph.post(&alice, "hi", true, None).unwrap();
        let second = graph.post(&bob, "hello", true, Some(&first)).unwrap();

        assert_eq!(second.previous_msg, Some(first.id));
        assert_eq!(second.originator, alice.id);
        assert!(!second.is_sent_by_originator());
    }

    #[test]
    fn post_with_foreign_previous_errors() {
        let graph = MessageGraph::new();
        let other = MessageGraph::new();
        let user = Participant::human("alice");
        let foreign = other.post(&user, "elsewhere", true, None).unwrap();

        let result = graph.post(&user, "hi", true, Some(&foreign));
        assert_eq!(result.unwrap_err(), GraphError::UnknownMessage(foreign.id));
    }

    #[test]
    fn replies_form_a_chain_back_to_the_cause() {
        let graph = MessageGraph::new();
        let user = Participant::human("alice");
        let bot = Participant::bot("EchoBot", "");

        let inbound = graph.post(&user, "hi", true, None).unwrap();
        let first = graph
            .append_reply(&inbound, &bot, ReplyDraft::interim("one"))
            .unwrap();
        let second = graph
            .append_reply(&inbound, &bot, ReplyDraft::terminal("two"))
            .unwrap();

        assert_eq!(first.previous_msg, Some(inbound.id));
        assert_eq!(second.previous_msg, Some(first.id));
        assert_eq!(first.in_fulfillment_of, Some(inbound.id));
        assert_eq!(second.in_fulfillment_of, Some(inbound.id));
        assert_eq!(second.originator, user.id);
        assert!(graph.is_terminated(&inbound.id));
        assert_eq!(graph.latest_reply(&inbound.id).unwrap().id, second.id);
    }

    #[test]
    fn append_after_terminal_is_rejected() {
        let graph = MessageGraph::new();
        let user = Participant::human("alice");
        let bot = Participant::bot("EchoBot", "");

        let inbound = graph.post(&user, "hi", true, None).unwrap();
        let done = graph
            .append_reply(&inbound, &bot, ReplyDraft::terminal("ih"))
            .unwrap();
        let result = graph.append_reply(&inbound, &bot, ReplyDraft::terminal("again"));

        assert_eq!(
            result.unwrap_err(),
            GraphError::TerminalSlotClosed {
                cause: inbound.id,
                terminal: done.id,
            }
        );
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn append_to_unknown_cause_errors() {
        let graph = MessageGraph::new();
        let other = MessageGraph::new();
        let user = Participant::human("alice");
        let bot = Participant::bot("EchoBot", "");
        let foreign = other.post(&user, "hi", true, None).unwrap();

        let result = graph.append_reply(&foreign, &bot, ReplyDraft::terminal("x"));
        assert!(matches!(result, Err(GraphError::UnknownMessage(id)) if id == foreign.id));
    }

    #[test]
    fn reconstruct_filters_hidden_messages() {
        let graph = MessageGraph::new();
        let user = Participant::human("alice");
        let bot = Participant::bot("PlainBot", "");

        let inbound = graph.post(&user, "question", true, None).unwrap();
        graph
            .append_reply(&inbound, &bot, ReplyDraft::service("`model-x`"))
            .unwrap();
        let answer = graph
            .append_reply(&inbound, &bot, ReplyDraft::terminal("answer"))
            .unwrap();

        assert_eq!(
            contents(&graph.reconstruct(&answer, false)),
            vec!["question", "answer"]
        );
        assert_eq!(
            contents(&graph.reconstruct(&answer, true)),
            vec!["question", "`model-x`", "answer"]
        );
    }

    #[test]
    fn reconstruct_spans_multiple_turns() {
        let graph = MessageGraph::new();
        let user = Participant::human("alice");
        let bot = Participant::bot("EchoBot", "");

        let hi = graph.post(&user, "hi", true, None).unwrap();
        let ih = graph.append_reply(&hi, &bot, ReplyDraft::terminal("ih")).unwrap();
        let yo = graph.post(&user, "yo", true, Some(&ih)).unwrap();
        let oy = graph.append_reply(&yo, &bot, ReplyDraft::terminal("oy")).unwrap();

        let first = graph.reconstruct(&oy, false);
        let second = graph.reconstruct(&oy, false);

        assert_eq!(contents(&first), vec!["hi", "ih", "yo", "oy"]);
        let first_ids: Vec<_> = first.iter().map(|m| m.id).collect();
        let second_ids: Vec<_> = second.iter().map(|m| m.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn previous_chains_terminate() {
        let graph = MessageGraph::new();
        let user = Participant::human("alice");
        let bot = Participant::bot("EchoBot", "");

        let mut tail = graph.post(&user, "0", true, None).unwrap();
        for i in 1..20 {
            tail = if i % 2 == 0 {
                graph.post(&user, i.to_string(), true, Some(&tail)).unwrap()
            } else {
                graph
                    .append_reply(&tail, &bot, ReplyDraft::terminal(i.to_string()))
                    .unwrap()
            };
        }

        let walked: Vec<_> = graph.conversation(&tail).walk_back().collect();
        assert_eq!(walked.len(), 20);
        assert!(walked.last().unwrap().previous_msg.is_none());
    }

    #[test]
    fn debug_impl() {
        let graph = MessageGraph::new();
        let debug = format!("{graph:?}");
        assert!(debug.contains("MessageGraph"));
        assert!(debug.contains("open_causes"));
    }
}
