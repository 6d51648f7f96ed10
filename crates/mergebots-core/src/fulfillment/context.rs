//! Per-invocation context handed to bot handlers.
//!
//! A `FulfillmentContext` is created by the engine for every handler call.
//! Delegating to another bot derives a child context: same inbound message,
//! depth + 1, and a child cancellation token (cancelling the parent cancels
//! the child, not the other way round).

use std::sync::Arc;

use futures_util::TryStreamExt;
use tokio_util::sync::CancellationToken;

use mergebots_types::message::MessageRef;
use mergebots_types::participant::Participant;

use crate::graph::MessageGraph;
use crate::registry::BotRef;

use super::engine::FulfillmentEngine;
use super::error::FulfillmentError;
use super::handler::MessageStream;

#[derive(Clone)]
pub struct FulfillmentContext {
    bot: BotRef,
    inbound: MessageRef,
    engine: FulfillmentEngine,
    cancellation: CancellationToken,
    /// Delegation depth (the bot the caller asked for = 0).
    depth: u8,
}

impl FulfillmentContext {
    pub(crate) fn new(
        bot: BotRef,
        inbound: MessageRef,
        engine: FulfillmentEngine,
        cancellation: CancellationToken,
        depth: u8,
    ) -> Self {
        Self {
            bot,
            inbound,
            engine,
            cancellation,
            depth,
        }
    }

    /// The bot being invoked.
    pub fn bot(&self) -> &BotRef {
        &self.bot
    }

    /// The invoked bot's participant identity.
    pub fn profile(&self) -> &Participant {
        &self.bot.profile
    }

    /// The message being fulfilled.
    pub fn inbound(&self) -> &MessageRef {
        &self.inbound
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn graph(&self) -> &Arc<MessageGraph> {
        self.engine.graph()
    }

    pub fn engine(&self) -> &FulfillmentEngine {
        &self.engine
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the consumer of this fulfillment has gone away.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Conversation up to and including the inbound message, oldest first,
    /// filtered by the engine's history policy.
    pub fn conversation(&self) -> Vec<MessageRef> {
        self.graph()
            .conversation(&self.inbound)
            .for_bots(self.engine.history_policy())
    }

    /// Fulfill the same inbound message with another bot.
    ///
    /// Messages from the returned stream belong to the inbound message and can
    /// be passed on with [`Reply::forward`](super::Reply::forward).
    pub fn delegate(&self, handle: &str) -> Result<MessageStream, FulfillmentError> {
        self.engine.run(
            handle,
            Arc::clone(&self.inbound),
            self.child_depth(handle)?,
            self.cancellation.child_token(),
            false,
        )
    }

    /// Ask another bot something on the side and collect its full answer.
    ///
    /// The question is posted as a new thread sent by this bot on behalf of
    /// the inbound's originator, so it never shows up in the user's history.
    /// The consulted bot must end with a terminal reply.
    pub async fn consult(
        &self,
        handle: &str,
        content: impl Into<String>,
    ) -> Result<Vec<MessageRef>, FulfillmentError> {
        let depth = self.child_depth(handle)?;
        let question = self
            .graph()
            .post_on_behalf(&self.bot.profile, content, self.inbound.originator);
        let answers = self.engine.run(
            handle,
            question,
            depth,
            self.cancellation.child_token(),
            true,
        )?;
        answers.try_collect().await
    }

    /// Depth of a fulfillment started from this one. Running out of `u8`
    /// counts as too deep, whatever the configured maximum.
    fn child_depth(&self, handle: &str) -> Result<u8, FulfillmentError> {
        self.depth
            .checked_add(1)
            .ok_or_else(|| FulfillmentError::DelegationTooDeep {
                handle: handle.to_string(),
                depth: self.depth,
                max: self.engine.config().max_delegation_depth,
            })
    }
}

impl std::fmt::Debug for FulfillmentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FulfillmentContext")
            .field("bot", &self.bot.handle)
            .field("inbound", &self.inbound.id)
            .field("depth", &self.depth)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
