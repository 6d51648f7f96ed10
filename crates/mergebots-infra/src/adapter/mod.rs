//! Chat adapter bridge.
//!
//! - `surface` -- `ChatSurface`, what a chat platform must provide
//! - `bridge` -- `ChatBridge`, channel tails and participant cache over the engine
//! - `text` -- outbound text chunking and error report rendering

pub mod bridge;
pub mod surface;
pub mod text;

pub use bridge::{BridgeOutcome, ChatBridge, InboundEvent};
pub use surface::ChatSurface;
pub use text::{chunk_text, fence, render_error};
