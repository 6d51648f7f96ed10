//! Router bot and the classifiers it routes with.
//!
//! - `classifier` -- `Classifier` trait (RPITIT) and `Candidate`
//! - `box_classifier` -- `BoxClassifier`, the object-safe wrapper
//! - `keyword` -- `KeywordClassifier`, a deterministic word-overlap classifier
//! - `bot` -- `RouterBot`, the delegating handler

pub mod bot;
pub mod box_classifier;
pub mod classifier;
pub mod keyword;

pub use bot::{CONVERSATION_RESTARTED, RouterBot, format_transcript};
pub use box_classifier::BoxClassifier;
pub use classifier::{Candidate, Classifier, normalize_choice, render_candidates};
pub use keyword::KeywordClassifier;
