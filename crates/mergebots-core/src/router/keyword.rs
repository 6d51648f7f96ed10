//! Deterministic word-overlap classifier.

use std::collections::HashSet;
use std::future::Future;

use super::classifier::{Candidate, Classifier};

const MIN_WORD_LEN: usize = 3;

/// Picks the candidate whose description shares the most words with the
/// latest user message. Ties go to the earlier candidate; no overlap at all
/// yields an empty answer, so the router falls back to its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Name of the best-matching candidate, or `None` without any overlap.
    pub fn best_match<'c>(&self, conversation: &str, candidates: &'c [Candidate]) -> Option<&'c str> {
        let wanted = words(latest_user_text(conversation));
        let mut best: Option<(&str, usize)> = None;
        for candidate in candidates {
            let score = words(&candidate.description).intersection(&wanted).count();
            if score > 0 && best.is_none_or(|(_, top)| score > top) {
                best = Some((&candidate.name, score));
            }
        }
        best.map(|(name, _)| name)
    }
}

impl Classifier for KeywordClassifier {
    fn choose(
        &self,
        conversation: &str,
        candidates: &[Candidate],
    ) -> impl Future<Output = anyhow::Result<String>> + Send {
        let choice = self
            .best_match(conversation, candidates)
            .unwrap_or_default()
            .to_string();
        async move { Ok(choice) }
    }
}

/// Text of the last `USER:` entry of a router transcript, or the whole text.
fn latest_user_text(conversation: &str) -> &str {
    match conversation.rfind("USER: ") {
        Some(at) => {
            let text = &conversation[at + "USER: ".len()..];
            text.split("\n\nASSISTANT: ").next().unwrap_or(text)
        }
        None => conversation,
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .map(str::to_lowercase)
        .collect()
}
