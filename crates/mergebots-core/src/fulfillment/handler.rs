//! Handler protocol: what a bot yields and how the engine calls it.

use std::pin::Pin;

use futures_util::Stream;

use mergebots_types::message::{MessageRef, ReplyDraft};

use super::context::FulfillmentContext;
use super::error::FulfillmentError;

/// One item produced by a bot handler.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A new reply the engine links into the graph on the bot's behalf.
    Compose(ReplyDraft),
    /// A message already produced for the same inbound by a delegated bot,
    /// passed through unchanged.
    Forward(MessageRef),
}

impl Reply {
    pub fn interim(content: impl Into<String>) -> Self {
        Self::Compose(ReplyDraft::interim(content))
    }

    pub fn terminal(content: impl Into<String>) -> Self {
        Self::Compose(ReplyDraft::terminal(content))
    }

    /// Hidden from bots, shown to humans; more replies follow.
    pub fn service(content: impl Into<String>) -> Self {
        Self::Compose(ReplyDraft::service(content))
    }

    /// Hidden from bots, shown to humans; completes the response.
    pub fn service_final(content: impl Into<String>) -> Self {
        Self::Compose(ReplyDraft::service_final(content))
    }

    pub fn forward(message: MessageRef) -> Self {
        Self::Forward(message)
    }

    /// Whether this reply ends the response.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Compose(draft) => !draft.still_typing,
            Self::Forward(message) => message.is_terminal(),
        }
    }
}

/// Lazily polled sequence of replies from a handler.
pub type ReplyStream = Pin<Box<dyn Stream<Item = anyhow::Result<Reply>> + Send + 'static>>;

/// Lazily polled sequence of stored messages produced by a fulfillment.
pub type MessageStream =
    Pin<Box<dyn Stream<Item = Result<MessageRef, FulfillmentError>> + Send + 'static>>;

/// A bot's fulfillment procedure.
///
/// Implementations return a stream without doing any work up front; the
/// engine polls it and appends each reply to the graph as it arrives.
/// Closures of the right shape implement this trait too.
pub trait BotHandler: Send + Sync {
    fn fulfill(&self, ctx: FulfillmentContext) -> ReplyStream;
}

impl<F> BotHandler for F
where
    F: Fn(FulfillmentContext) -> ReplyStream + Send + Sync,
{
    fn fulfill(&self, ctx: FulfillmentContext) -> ReplyStream {
        self(ctx)
    }
}
