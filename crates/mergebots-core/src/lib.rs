//! Orchestration core for MergeBots.
//!
//! Bots are registered handlers that take part in a shared, branching
//! conversation. This crate holds the message graph, the bot registry, the
//! fulfillment engine that drives handlers, the streaming paragraph splitter,
//! the presence coordinator, and the router bot. It depends only on
//! `mergebots-types` -- never on `mergebots-infra` or any platform crate.

pub mod fulfillment;
pub mod graph;
pub mod presence;
pub mod registry;
pub mod router;
pub mod streaming;
