//! Shared domain types for MergeBots.
//!
//! This crate contains the core domain types used across the MergeBots runtime:
//! Participant, Message, their identifiers, global configuration, and the
//! message graph error type.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod message;
pub mod participant;
