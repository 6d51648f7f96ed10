//! Interactive terminal chat.
//!
//! The terminal is one chat channel: lines typed at the prompt go through
//! the same [`ChatBridge`](mergebots_infra::adapter::ChatBridge) a chat
//! platform adapter uses, a spinner stands in for the typing indicator, and
//! every delivered message is printed above the prompt.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod surface;

pub use loop_runner::run_chat_loop;
