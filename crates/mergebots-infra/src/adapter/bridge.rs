//! ChatBridge -- connects a chat platform to the fulfillment engine.
//!
//! The bridge keeps, per platform channel, the last message of the current
//! conversation (its "tail"), and one participant per platform author. Each
//! inbound event is posted after the tail, fulfilled by the configured bot,
//! and every reply is delivered in platform-sized pieces. The tail moves only
//! once a message has been delivered.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::StreamExt;
use tracing::{debug, warn};

use mergebots_core::fulfillment::FulfillmentEngine;
use mergebots_core::presence::with_presence;
use mergebots_types::config::AdapterConfig;
use mergebots_types::message::{MessageRef, ReplyDraft};
use mergebots_types::participant::Participant;

use super::surface::ChatSurface;
use super::text::{chunk_text, fence, render_error};

/// Room left in a platform message for the code fence around error text.
const FENCE_OVERHEAD: usize = 8;

/// A text message observed on the platform.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub channel_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
}

/// What happened while handling one inbound event.
#[derive(Debug)]
pub struct BridgeOutcome {
    pub inbound: MessageRef,
    /// Bot messages delivered to the surface, in order.
    pub delivered: Vec<MessageRef>,
    /// Hidden error report, if the exchange failed.
    pub error: Option<MessageRef>,
}

pub struct ChatBridge {
    engine: FulfillmentEngine,
    bot_handle: String,
    config: AdapterConfig,
    /// channel id -> last delivered message.
    tails: DashMap<String, MessageRef>,
    /// platform author id -> participant.
    users: DashMap<String, Participant>,
    /// Sender of error reports.
    reporter: Participant,
}

impl ChatBridge {
    pub fn new(engine: FulfillmentEngine, bot_handle: impl Into<String>, config: AdapterConfig) -> Self {
        Self {
            engine,
            bot_handle: bot_handle.into(),
            config,
            tails: DashMap::new(),
            users: DashMap::new(),
            reporter: Participant::bot("MergeBots", "Reports failed exchanges."),
        }
    }

    pub fn bot_handle(&self) -> &str {
        &self.bot_handle
    }

    pub fn engine(&self) -> &FulfillmentEngine {
        &self.engine
    }

    /// Stable participant for a platform author. A changed display name is
    /// picked up without changing the participant id.
    pub fn participant_for(&self, author_id: &str, author_name: &str) -> Participant {
        let mut user = self
            .users
            .entry(author_id.to_string())
            .or_insert_with(|| Participant::human(author_name));
        if user.name != author_name {
            user.name = author_name.to_string();
        }
        user.clone()
    }

    /// Current conversation tail of a channel.
    pub fn tail(&self, channel_id: &str) -> Option<MessageRef> {
        self.tails.get(channel_id).map(|t| Arc::clone(t.value()))
    }

    /// Post an inbound event, fulfill it and deliver every reply to `surface`.
    ///
    /// A message starting with the restart prefix starts a new conversation
    /// in its channel and is hidden from bots. Failures of the exchange are
    /// reported to the surface as a fenced message and recorded as a hidden
    /// terminal reply; only a failure to deliver that report is returned.
    pub async fn handle_inbound<S: ChatSurface>(
        &self,
        event: InboundEvent,
        surface: &S,
    ) -> anyhow::Result<BridgeOutcome> {
        let user = self.participant_for(&event.author_id, &event.author_name);
        let restart = event.content.starts_with(&self.config.restart_prefix);
        let previous = if restart {
            debug!(channel = %event.channel_id, "conversation restarted");
            None
        } else {
            self.tail(&event.channel_id)
        };

        let inbound = self
            .engine
            .graph()
            .post(&user, event.content, !restart, previous.as_deref())?;
        self.tails
            .insert(event.channel_id.clone(), Arc::clone(&inbound));

        let mut delivered = Vec::new();
        let exchange = self
            .exchange(&event.channel_id, &inbound, surface, &mut delivered)
            .await;

        let error = match exchange {
            Ok(()) => None,
            Err(err) => {
                warn!(channel = %event.channel_id, error = %err, "exchange failed");
                Some(self.report(&event.channel_id, &inbound, &err, surface).await?)
            }
        };

        Ok(BridgeOutcome {
            inbound,
            delivered,
            error,
        })
    }

    async fn exchange<S: ChatSurface>(
        &self,
        channel_id: &str,
        inbound: &MessageRef,
        surface: &S,
        delivered: &mut Vec<MessageRef>,
    ) -> anyhow::Result<()> {
        let replies = self.engine.fulfill(&self.bot_handle, Arc::clone(inbound))?;
        let mut replies = with_presence(replies, surface.presence());

        while let Some(item) = replies.next().await {
            let message = item?;
            for chunk in chunk_text(&message.content, self.config.max_message_len) {
                surface.send(&chunk).await?;
            }
            self.tails
                .insert(channel_id.to_string(), Arc::clone(&message));
            delivered.push(message);
        }
        Ok(())
    }

    /// Send a rendered error to the surface and record it as a hidden reply.
    async fn report<S: ChatSurface>(
        &self,
        channel_id: &str,
        inbound: &MessageRef,
        err: &anyhow::Error,
        surface: &S,
    ) -> anyhow::Result<MessageRef> {
        let rendered = render_error(err, self.config.max_error_len);
        let limit = self.config.max_message_len.saturating_sub(FENCE_OVERHEAD);

        for chunk in chunk_text(&rendered, limit) {
            surface.send(&fence(&chunk)).await?;
        }

        let graph = self.engine.graph();
        let recorded = match graph.append_reply(
            inbound,
            &self.reporter,
            ReplyDraft::service_final(fence(&rendered)),
        ) {
            Ok(message) => message,
            // The bot already finished; keep the report in the thread anyway.
            Err(_) => {
                let tail = self.tail(channel_id);
                graph.post(&self.reporter, fence(&rendered), false, tail.as_deref())?
            }
        };
        self.tails
            .insert(channel_id.to_string(), Arc::clone(&recorded));
        Ok(recorded)
    }
}

impl std::fmt::Debug for ChatBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatBridge")
            .field("bot_handle", &self.bot_handle)
            .field("channels", &self.tails.len())
            .field("users", &self.users.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
