//! Adapters from incremental token output to the reply protocol.

pub mod splitter;

pub use splitter::{ConsumerGone, ParagraphSplitter, ParagraphStream, split_token_stream};
