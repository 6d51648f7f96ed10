//! Global configuration types for MergeBots.
//!
//! `GlobalConfig` represents the top-level `config.toml`. Every section and
//! every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the MergeBots runtime.
///
/// Loaded from `~/.mergebots/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub splitter: SplitterConfig,
    #[serde(default)]
    pub history: HistoryPolicy,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub adapter: AdapterConfig,
}

/// Fulfillment engine limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many nested delegations a single inbound message may go through.
    #[serde(default = "default_max_delegation_depth")]
    pub max_delegation_depth: u8,
}

fn default_max_delegation_depth() -> u8 {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_delegation_depth: default_max_delegation_depth(),
        }
    }
}

/// Streaming paragraph splitter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Bound of the paragraph queue between the token producer and the consumer.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Which messages bots see when they rebuild the conversation so far.
///
/// Hidden messages sent by humans (restart commands) are never shown to bots.
/// Hidden service messages sent by bots (model or routing announcements) are
/// shown to later bots only when `include_bot_service_messages` is set. The
/// flag covers every bot sender, so restart notices and error reports an
/// adapter records under its own bot identity are shown too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPolicy {
    #[serde(default)]
    pub include_bot_service_messages: bool,
}

/// Router bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Handle used when the classifier picks nothing usable.
    #[serde(default = "default_router_handle")]
    pub default_handle: String,
    /// Emit a hidden service message naming the chosen bot.
    #[serde(default)]
    pub announce_choice: bool,
}

fn default_router_handle() -> String {
    "EchoBot".to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_handle: default_router_handle(),
            announce_choice: false,
        }
    }
}

/// Chat adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Inbound text starting with this prefix restarts the channel conversation.
    #[serde(default = "default_restart_prefix")]
    pub restart_prefix: String,
    /// Maximum characters per outbound platform message.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    /// Maximum characters of a rendered error report.
    #[serde(default = "default_max_error_len")]
    pub max_error_len: usize,
}

fn default_restart_prefix() -> String {
    "!".to_string()
}

fn default_max_message_len() -> usize {
    1900
}

fn default_max_error_len() -> usize {
    1500
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            restart_prefix: default_restart_prefix(),
            max_message_len: default_max_message_len(),
            max_error_len: default_max_error_len(),
        }
    }
}
