//! Conversation message types for MergeBots.
//!
//! A [`Message`] is immutable once created. Threading is expressed through
//! id back-references (`previous_msg`, `in_fulfillment_of`, `originator`)
//! resolved by the message graph, never through owned pointers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::participant::{Participant, ParticipantId};

/// Unique identifier for a message, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Create a new MessageId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A message sent by a human or a bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Participant,
    pub content: String,
    /// More messages from the same responder follow before the cause is resolved.
    pub is_still_typing: bool,
    /// Whether bots see this message when rebuilding conversation history.
    pub is_visible_to_bots: bool,
    /// Message immediately preceding this one in the same reply sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_msg: Option<MessageId>,
    /// Inbound message this one was produced in response to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_fulfillment_of: Option<MessageId>,
    /// Participant who started the thread; copied unchanged into every reply.
    pub originator: ParticipantId,
    pub created_at: DateTime<Utc>,
}

/// Shared handle to an immutable message stored in a graph.
pub type MessageRef = Arc<Message>;

impl Message {
    /// A terminal message is the last word of its sender for its cause.
    pub fn is_terminal(&self) -> bool {
        !self.is_still_typing
    }

    /// Whether the sender is the participant who started the thread.
    pub fn is_sent_by_originator(&self) -> bool {
        self.sender.id == self.originator
    }

    pub fn is_sent_by(&self, participant: ParticipantId) -> bool {
        self.sender.id == participant
    }
}

/// Content and flags of a reply that has not been linked into a graph yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyDraft {
    pub content: String,
    pub still_typing: bool,
    pub visible_to_bots: bool,
}

impl ReplyDraft {
    /// A visible reply that will be followed by more replies.
    pub fn interim(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            still_typing: true,
            visible_to_bots: true,
        }
    }

    /// A visible reply that completes the response.
    pub fn terminal(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            still_typing: false,
            visible_to_bots: true,
        }
    }

    /// A notice shown to humans only (model announcements, routing choices).
    pub fn service(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            still_typing: true,
            visible_to_bots: false,
        }
    }

    /// A hidden notice that also completes the response.
    pub fn service_final(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            still_typing: false,
            visible_to_bots: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(sender: Participant, originator: ParticipantId) -> Message {
        Message {
            id: MessageId::new(),
            sender,
            content: "hi".to_string(),
            is_still_typing: false,
            is_visible_to_bots: true,
            previous_msg: None,
            in_fulfillment_of: None,
            originator,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sent_by_originator() {
        let user = Participant::human("alice");
        let bot = Participant::bot("EchoBot", "");
        let from_user = sample(user.clone(), user.id);
        let from_bot = sample(bot.clone(), user.id);

        assert!(from_user.is_sent_by_originator());
        assert!(!from_bot.is_sent_by_originator());
        assert!(from_bot.is_sent_by(bot.id));
    }

    #[test]
    fn test_message_json_omits_missing_links() {
        let user = Participant::human("alice");
        let msg = sample(user.clone(), user.id);
        let json = serde_json::to_string(&msg).unwrap();

        assert!(!json.contains("previous_msg"));
        assert!(!json.contains("in_fulfillment_of"));

        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, msg.id);
        assert!(parsed.is_terminal());
    }

    #[test]
    fn test_reply_draft_flags() {
        assert!(ReplyDraft::interim("a").still_typing);
        assert!(ReplyDraft::interim("a").visible_to_bots);
        assert!(!ReplyDraft::terminal("a").still_typing);
        assert!(!ReplyDraft::service("a").visible_to_bots);
        assert!(ReplyDraft::service("a").still_typing);

        let done = ReplyDraft::service_final("a");
        assert!(!done.still_typing && !done.visible_to_bots);
    }
}
