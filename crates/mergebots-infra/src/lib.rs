//! Infrastructure layer for MergeBots.
//!
//! Contains what sits between the orchestration core and the outside world:
//! loading `config.toml` from the data directory, and the chat adapter bridge
//! that maps a chat surface's channels and authors onto the message graph.

pub mod adapter;
pub mod config;
