//! Conversation participants: humans and bots.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a participant, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    /// Create a new ParticipantId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a ParticipantId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// What kind of participant this is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParticipantKind {
    /// A human talking through some chat surface.
    Human,
    /// A registered bot.
    Bot {
        /// Unique routing key within a registry.
        handle: String,
        /// Free text used by routers to pick a bot.
        description: String,
    },
}

/// A human or bot identity that can send messages.
///
/// Participants are immutable once created. The fulfillment handler of a bot
/// is not part of this value; it lives in the registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
    pub kind: ParticipantKind,
}

impl Participant {
    /// Create a human participant with a fresh id.
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(),
            name: name.into(),
            kind: ParticipantKind::Human,
        }
    }

    /// Create a bot participant with a fresh id. The display name defaults to the handle.
    pub fn bot(handle: impl Into<String>, description: impl Into<String>) -> Self {
        let handle = handle.into();
        Self {
            id: ParticipantId::new(),
            name: handle.clone(),
            kind: ParticipantKind::Bot {
                handle,
                description: description.into(),
            },
        }
    }

    /// Replace the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_human(&self) -> bool {
        matches!(self.kind, ParticipantKind::Human)
    }

    /// Routing handle, if this participant is a bot.
    pub fn handle(&self) -> Option<&str> {
        match &self.kind {
            ParticipantKind::Bot { handle, .. } => Some(handle),
            ParticipantKind::Human => None,
        }
    }

    /// Bot description, if this participant is a bot.
    pub fn description(&self) -> Option<&str> {
        match &self.kind {
            ParticipantKind::Bot { description, .. } => Some(description),
            ParticipantKind::Human => None,
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParticipantKind::Human => write!(f, "{}", self.name),
            ParticipantKind::Bot { handle, .. } => write!(f, "{} ({handle})", self.name),
        }
    }
}
