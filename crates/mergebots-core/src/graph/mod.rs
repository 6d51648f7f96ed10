//! Append-only message graph.
//!
//! - `store` -- `MessageGraph`, an arena of immutable messages indexed by id
//! - `conversation` -- lazy `Conversation` views walked back from a tail message

pub mod conversation;
pub mod store;

pub use conversation::{Conversation, WalkBack, bot_visible};
pub use store::MessageGraph;
