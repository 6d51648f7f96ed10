//! Fulfillment protocol and engine.
//!
//! - `handler` -- `BotHandler`, `Reply` and the stream types bots produce
//! - `context` -- `FulfillmentContext` passed to every handler call
//! - `engine` -- `FulfillmentEngine`, which drives handlers and records replies
//! - `error` -- `FulfillmentError` and `HandlerError`

pub mod context;
pub mod engine;
pub mod error;
pub mod handler;

pub use context::FulfillmentContext;
pub use engine::FulfillmentEngine;
pub use error::{FulfillmentError, HandlerError};
pub use handler::{BotHandler, MessageStream, Reply, ReplyStream};
