//! Span and event field names.
//!
//! Use them with the `{ CONST } = value` field syntax of the `tracing`
//! macros. The core crate spells the same names literally in its
//! fulfillment span; keep both in sync.

/// Handle of the bot being fulfilled (e.g. "EchoBot").
pub const BOT_HANDLE: &str = "bot.handle";

/// Id of the inbound message a fulfillment answers.
pub const MESSAGE_ID: &str = "message.id";

/// Delegation depth; 0 for a top-level fulfillment.
pub const DEPTH: &str = "depth";

/// Chat channel an inbound event came from.
pub const CHANNEL_ID: &str = "channel.id";

/// Bot chosen by a router.
pub const ROUTER_CHOICE: &str = "chosen";

/// Span name for one fulfillment.
pub const FULFILL_SPAN: &str = "fulfill";

/// Span name for one inbound chat event.
pub const INBOUND_SPAN: &str = "inbound";

/// Every field name above, for exporters that want an allow-list.
pub const ALL_FIELDS: &[&str] = &[BOT_HANDLE, MESSAGE_ID, DEPTH, CHANNEL_ID, ROUTER_CHOICE];
