//! Outbound text helpers.

use mergebots_core::fulfillment::FulfillmentError;

const TRUNCATION_MARK: &str = "\n... (truncated)";

/// Split `text` into pieces of at most `limit` characters.
///
/// A piece ends at the last newline that fits when there is one, otherwise
/// the text is cut at the limit. Blank text yields no pieces.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > limit {
        let cut = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let split = match rest[..cut].rfind('\n') {
            Some(i) if i > 0 => i + 1,
            _ => cut,
        };
        let piece = rest[..split].trim_end_matches('\n');
        if !piece.trim().is_empty() {
            chunks.push(piece.to_string());
        }
        rest = &rest[split..];
    }

    if !rest.trim().is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

/// Wrap `text` in a code fence.
pub fn fence(text: &str) -> String {
    format!("```\n{text}\n```")
}

/// Human-readable report for a failed exchange, at most `max_len` characters.
///
/// Handler failures keep their full context chain; the wrapping added by
/// the engine is peeled off first.
pub fn render_error(err: &anyhow::Error, max_len: usize) -> String {
    let report = match err.downcast_ref::<FulfillmentError>() {
        Some(fulfillment) => fulfillment.report(),
        None => format!("{err:?}"),
    };
    truncate(&report, max_len)
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(TRUNCATION_MARK.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARK);
    out
}
