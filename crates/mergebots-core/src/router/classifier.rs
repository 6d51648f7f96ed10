//! Classifier trait definition.
//!
//! A classifier picks which bot should answer the latest message of a
//! conversation. Uses RPITIT for `choose`; see `BoxClassifier` for the
//! object-safe wrapper.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// A bot the classifier may choose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub description: String,
}

/// Chooses one candidate name for a conversation transcript.
pub trait Classifier: Send + Sync {
    /// Return the name of one of `candidates`. Anything else (including an
    /// empty string) makes the router fall back to its default bot.
    fn choose(
        &self,
        conversation: &str,
        candidates: &[Candidate],
    ) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// JSON list of candidates, the form model-backed classifiers put in prompts.
pub fn render_candidates(candidates: &[Candidate]) -> serde_json::Result<String> {
    serde_json::to_string(candidates)
}

/// Reduce a raw classifier answer to a bare handle.
///
/// Keeps the first non-empty line and strips surrounding whitespace, quotes
/// and backticks.
pub fn normalize_choice(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_decoration() {
        assert_eq!(normalize_choice("ListenerBot"), "ListenerBot");
        assert_eq!(normalize_choice("  \"ListenerBot\"  "), "ListenerBot");
        assert_eq!(normalize_choice("`FactBot`\nbecause facts"), "FactBot");
        assert_eq!(normalize_choice("\n\n  'EchoBot'\n"), "EchoBot");
        assert_eq!(normalize_choice(""), "");
        assert_eq!(normalize_choice("\"\""), "");
    }

    #[test]
    fn candidates_render_as_json_objects() {
        let candidates = vec![Candidate {
            name: "ListenerBot".to_string(),
            description: "useful when user needs to vent".to_string(),
        }];
        let json = render_candidates(&candidates).unwrap();
        assert_eq!(
            json,
            r#"[{"name":"ListenerBot","description":"useful when user needs to vent"}]"#
        );
    }
}
