//! Fulfillment engine: drives a bot handler and records its replies.
//!
//! `fulfill` resolves the bot eagerly and returns a lazily polled stream. Each
//! reply the handler yields is linked into the message graph as a reply to the
//! inbound message, then handed to the caller. Dropping the stream drops the
//! handler's stream (and every delegated stream it is polling) and cancels the
//! context's token.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, info_span};

use mergebots_types::config::{EngineConfig, HistoryPolicy};
use mergebots_types::error::GraphError;
use mergebots_types::message::{MessageId, MessageRef};

use crate::graph::MessageGraph;
use crate::registry::BotRegistry;

use super::context::FulfillmentContext;
use super::error::{FulfillmentError, HandlerError};
use super::handler::{MessageStream, Reply};

struct EngineInner {
    registry: Arc<BotRegistry>,
    graph: Arc<MessageGraph>,
    config: EngineConfig,
    history: HistoryPolicy,
}

/// Cheap-to-clone handle to the registry and graph that bots run against.
#[derive(Clone)]
pub struct FulfillmentEngine {
    inner: Arc<EngineInner>,
}

impl FulfillmentEngine {
    pub fn new(registry: Arc<BotRegistry>, graph: Arc<MessageGraph>) -> Self {
        Self::with_config(
            registry,
            graph,
            EngineConfig::default(),
            HistoryPolicy::default(),
        )
    }

    pub fn with_config(
        registry: Arc<BotRegistry>,
        graph: Arc<MessageGraph>,
        config: EngineConfig,
        history: HistoryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                registry,
                graph,
                config,
                history,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<BotRegistry> {
        &self.inner.registry
    }

    pub fn graph(&self) -> &Arc<MessageGraph> {
        &self.inner.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn history_policy(&self) -> &HistoryPolicy {
        &self.inner.history
    }

    /// Fulfill `inbound` with the bot registered under `handle`.
    ///
    /// An unknown handle is reported here, before any stream exists. Handler
    /// failures and protocol violations arrive as the last stream item.
    pub fn fulfill(
        &self,
        handle: &str,
        inbound: MessageRef,
    ) -> Result<MessageStream, FulfillmentError> {
        self.run(handle, inbound, 0, CancellationToken::new(), false)
    }

    /// Like [`fulfill`](Self::fulfill), but a handler that finishes without a
    /// terminal reply is a protocol violation.
    pub fn fulfill_strict(
        &self,
        handle: &str,
        inbound: MessageRef,
    ) -> Result<MessageStream, FulfillmentError> {
        self.run(handle, inbound, 0, CancellationToken::new(), true)
    }

    pub(crate) fn run(
        &self,
        handle: &str,
        inbound: MessageRef,
        depth: u8,
        cancellation: CancellationToken,
        strict: bool,
    ) -> Result<MessageStream, FulfillmentError> {
        let max = self.inner.config.max_delegation_depth;
        if depth > max {
            return Err(FulfillmentError::DelegationTooDeep {
                handle: handle.to_string(),
                depth,
                max,
            });
        }

        let bot = self.inner.registry.lookup(handle)?;
        if !self.inner.graph.contains(&inbound.id) {
            return Err(GraphError::UnknownMessage(inbound.id).into());
        }

        let span = info_span!(
            "fulfill",
            bot.handle = %bot.handle,
            message.id = %inbound.id,
            depth
        );

        let ctx = FulfillmentContext::new(
            Arc::clone(&bot),
            Arc::clone(&inbound),
            self.clone(),
            cancellation.clone(),
            depth,
        );
        let mut replies = span.in_scope(|| bot.handler.fulfill(ctx));
        let graph = Arc::clone(&self.inner.graph);
        let guard = cancellation.drop_guard();

        let messages: MessageStream = Box::pin(try_stream! {
            let _guard = guard;
            let mut terminal: Option<MessageId> = None;

            while let Some(item) = replies.next().await {
                let reply = item.map_err(|source| lift_handler_error(&bot.handle, source))?;

                ensure_open(&bot.handle, terminal)?;

                let message = match reply {
                    Reply::Compose(draft) => graph.append_reply(&inbound, &bot.profile, draft)?,
                    Reply::Forward(message) => {
                        ensure_fulfills(&bot.handle, &message, inbound.id)?;
                        message
                    }
                };

                if message.is_terminal() {
                    terminal = Some(message.id);
                }
                debug!(message.id = %message.id, terminal = message.is_terminal(), "reply");
                yield message;
            }

            if strict {
                ensure_terminated(&bot.handle, terminal)?;
            }
        });

        Ok(Box::pin(InSpan {
            inner: messages,
            span,
        }))
    }
}

impl std::fmt::Debug for FulfillmentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FulfillmentEngine")
            .field("bots", &self.inner.registry.len())
            .field("messages", &self.inner.graph.len())
            .field("config", &self.inner.config)
            .field("history", &self.inner.history)
            .finish()
    }
}

/// Failures from nested fulfillments that a handler propagated with `?` keep
/// their original variant; anything else is attributed to the handler.
fn lift_handler_error(handle: &str, source: anyhow::Error) -> FulfillmentError {
    match source.downcast::<FulfillmentError>() {
        Ok(nested) => nested,
        Err(source) => HandlerError::new(handle, source).into(),
    }
}

fn ensure_open(handle: &str, terminal: Option<MessageId>) -> Result<(), FulfillmentError> {
    match terminal {
        Some(done) => Err(FulfillmentError::ProtocolViolation(format!(
            "bot '{handle}' produced a reply after its terminal message {done}"
        ))),
        None => Ok(()),
    }
}

fn ensure_fulfills(
    handle: &str,
    message: &MessageRef,
    inbound: MessageId,
) -> Result<(), FulfillmentError> {
    if message.in_fulfillment_of == Some(inbound) {
        Ok(())
    } else {
        Err(FulfillmentError::ProtocolViolation(format!(
            "bot '{handle}' forwarded message {} which does not fulfill {inbound}",
            message.id
        )))
    }
}

fn ensure_terminated(handle: &str, terminal: Option<MessageId>) -> Result<(), FulfillmentError> {
    match terminal {
        Some(_) => Ok(()),
        None => Err(FulfillmentError::ProtocolViolation(format!(
            "bot '{handle}' finished without a terminal message"
        ))),
    }
}

/// Enters `span` for every poll of the wrapped stream.
struct InSpan {
    inner: MessageStream,
    span: Span,
}

impl Stream for InSpan {
    type Item = Result<MessageRef, FulfillmentError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _entered = this.span.enter();
        this.inner.as_mut().poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
