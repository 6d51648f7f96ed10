use thiserror::Error;

use crate::message::MessageId;

/// Errors from message graph operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("message {0} is not stored in this graph")]
    UnknownMessage(MessageId),

    #[error("message {cause} already has a terminal reply ({terminal})")]
    TerminalSlotClosed {
        cause: MessageId,
        terminal: MessageId,
    },
}
