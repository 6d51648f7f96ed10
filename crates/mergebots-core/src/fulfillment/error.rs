use thiserror::Error;

use mergebots_types::error::GraphError;

/// Errors surfaced while fulfilling an inbound message.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("no bot registered under handle '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("delegation to '{handle}' exceeds depth limit ({depth} > {max})")]
    DelegationTooDeep { handle: String, depth: u8, max: u8 },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl FulfillmentError {
    /// Full rendering for humans, including the handler's context chain and
    /// backtrace when one was captured.
    pub fn report(&self) -> String {
        match self {
            Self::Handler(err) => err.report(),
            other => other.to_string(),
        }
    }
}

/// A bot handler failed while producing replies.
///
/// The handler's own error is kept intact as the source, so its type can be
/// recovered with `downcast_ref` and its context chain is never flattened.
#[derive(Debug, Error)]
#[error("bot '{handle}' failed: {source:#}")]
pub struct HandlerError {
    handle: String,
    #[source]
    source: anyhow::Error,
}

impl HandlerError {
    pub fn new(handle: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            handle: handle.into(),
            source,
        }
    }

    /// Handle of the bot whose handler failed.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.source
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.source
    }

    /// `{:?}` rendering of the source: message, causes and backtrace.
    pub fn report(&self) -> String {
        format!("{} raised:\n{:?}", self.handle, self.source)
    }
}
