//! Paragraph splitter for token streams.
//!
//! A generative backend pushes tokens into a [`ParagraphSplitter`]; the bot
//! handler reads finished paragraphs from the paired [`ParagraphStream`] as
//! replies. Paragraphs are separated by a blank line. Splitting is suspended
//! while a fenced code block is open, so a code block is never torn across two
//! messages.
//!
//! The two halves communicate over a bounded channel. Buffer mutation and
//! queue insertion happen under one lock, so tokens may be delivered from any
//! task or from a backend's own OS thread.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use mergebots_types::message::ReplyDraft;

use crate::fulfillment::{Reply, ReplyStream};

const FENCE: &str = "```";
const PARAGRAPH_BREAK: &str = "\n\n";

/// The reading half was dropped; the producer should stop.
#[derive(Debug, Error)]
#[error("paragraph consumer has gone away")]
pub struct ConsumerGone;

struct SplitState {
    buffer: String,
    finished: bool,
}

struct Shared {
    state: Mutex<SplitState>,
    tx: mpsc::Sender<anyhow::Result<ReplyDraft>>,
}

/// Backend-facing half: receives tokens and emits paragraphs.
#[derive(Clone)]
pub struct ParagraphSplitter {
    shared: Arc<Shared>,
}

/// Consumer-facing half: yields the emitted paragraphs as replies.
pub struct ParagraphStream {
    rx: mpsc::Receiver<anyhow::Result<ReplyDraft>>,
    splitter: ParagraphSplitter,
}

impl ParagraphSplitter {
    /// Create a splitter whose queue holds at most `capacity` paragraphs.
    pub fn new(capacity: usize) -> (ParagraphSplitter, ParagraphStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let splitter = ParagraphSplitter {
            shared: Arc::new(Shared {
                state: Mutex::new(SplitState {
                    buffer: String::new(),
                    finished: false,
                }),
                tx,
            }),
        };
        let stream = ParagraphStream {
            rx,
            splitter: splitter.clone(),
        };
        (splitter, stream)
    }

    /// Feed one token. Suspends while the queue is full.
    pub async fn on_token(&self, token: &str) -> Result<(), ConsumerGone> {
        let mut state = self.shared.state.lock().await;
        if state.finished {
            return Ok(());
        }
        state.buffer.push_str(token);
        // Backends pad their output, so only a visible token confirms that a
        // pending blank line really ends a paragraph.
        if token.trim().is_empty() {
            return Ok(());
        }
        for paragraph in take_paragraphs(&mut state.buffer) {
            debug!(len = paragraph.len(), "paragraph");
            self.shared
                .tx
                .send(Ok(ReplyDraft::interim(paragraph)))
                .await
                .map_err(|_| ConsumerGone)?;
        }
        Ok(())
    }

    /// Flush the rest of the buffer as the final reply. Later calls do nothing.
    pub async fn on_end(&self) -> Result<(), ConsumerGone> {
        let mut state = self.shared.state.lock().await;
        if state.finished {
            return Ok(());
        }
        state.finished = true;
        let rest = std::mem::take(&mut state.buffer);
        self.shared
            .tx
            .send(Ok(ReplyDraft::terminal(rest)))
            .await
            .map_err(|_| ConsumerGone)
    }

    /// Forward a backend failure to the consumer, ending the reply sequence.
    pub async fn fail(&self, err: anyhow::Error) {
        let mut state = self.shared.state.lock().await;
        if state.finished {
            warn!(error = %err, "backend failed after the final paragraph");
            return;
        }
        state.finished = true;
        if self.shared.tx.send(Err(err)).await.is_err() {
            debug!("backend failure dropped, consumer has gone away");
        }
    }

    /// [`on_token`](Self::on_token) for backends that deliver tokens from
    /// their own OS thread. Must not be called from async code.
    pub fn blocking_on_token(&self, token: &str) -> Result<(), ConsumerGone> {
        let mut state = self.shared.state.blocking_lock();
        if state.finished {
            return Ok(());
        }
        state.buffer.push_str(token);
        if token.trim().is_empty() {
            return Ok(());
        }
        for paragraph in take_paragraphs(&mut state.buffer) {
            self.shared
                .tx
                .blocking_send(Ok(ReplyDraft::interim(paragraph)))
                .map_err(|_| ConsumerGone)?;
        }
        Ok(())
    }

    /// [`on_end`](Self::on_end) for backends running on their own OS thread.
    pub fn blocking_on_end(&self) -> Result<(), ConsumerGone> {
        let mut state = self.shared.state.blocking_lock();
        if state.finished {
            return Ok(());
        }
        state.finished = true;
        let rest = std::mem::take(&mut state.buffer);
        self.shared
            .tx
            .blocking_send(Ok(ReplyDraft::terminal(rest)))
            .map_err(|_| ConsumerGone)
    }
}

impl std::fmt::Debug for ParagraphSplitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParagraphSplitter")
            .field("capacity", &self.shared.tx.max_capacity())
            .finish_non_exhaustive()
    }
}

impl ParagraphStream {
    /// Run `producer` on its own task and stream the paragraphs it produces.
    ///
    /// The producer is spawned when the returned stream is first polled, so
    /// nothing is generated for a reader that never reads. The final
    /// paragraph is flushed when the producer returns `Ok`. An `Err` or a
    /// panic is re-raised to the reader after the paragraphs emitted so far.
    /// Dropping the returned stream aborts the producer.
    pub fn drive<F>(self, producer: F) -> ReplyStream
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let supervisor: Supervisor = Box::pin(supervise(
            self.splitter.clone(),
            producer,
            cancel.clone(),
        ));
        replies(self.rx, Some((supervisor, cancel)))
    }

    /// Stream paragraphs fed by someone else (for example a backend thread
    /// calling the blocking methods). The feeder must finish with `on_end`
    /// or `fail`.
    pub fn into_replies(self) -> ReplyStream {
        replies(self.rx, None)
    }
}

impl std::fmt::Debug for ParagraphStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParagraphStream").finish_non_exhaustive()
    }
}

type Supervisor = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Run `producer` to completion and report how it ended through `splitter`.
async fn supervise<F>(splitter: ParagraphSplitter, producer: F, stop: CancellationToken)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let mut task = tokio::spawn(producer);
    let abort = task.abort_handle();
    tokio::select! {
        _ = stop.cancelled() => abort.abort(),
        joined = &mut task => match joined {
            Ok(Ok(())) => {
                if splitter.on_end().await.is_err() {
                    debug!("final paragraph dropped, consumer has gone away");
                }
            }
            Ok(Err(err)) => splitter.fail(err).await,
            Err(join) if join.is_panic() => {
                splitter.fail(anyhow::anyhow!("token producer panicked")).await;
            }
            Err(join) => {
                splitter.fail(anyhow::anyhow!("token producer stopped: {join}")).await;
            }
        },
    }
}

fn replies(
    mut rx: mpsc::Receiver<anyhow::Result<ReplyDraft>>,
    start: Option<(Supervisor, CancellationToken)>,
) -> ReplyStream {
    Box::pin(try_stream! {
        let _guard = start.map(|(supervisor, cancel)| {
            tokio::spawn(supervisor);
            cancel.drop_guard()
        });
        while let Some(item) = rx.recv().await {
            let draft = item?;
            let done = !draft.still_typing;
            yield Reply::Compose(draft);
            if done {
                break;
            }
        }
    })
}

/// Split a stream of tokens into paragraph replies.
pub fn split_token_stream<S>(tokens: S, capacity: usize) -> ReplyStream
where
    S: Stream<Item = anyhow::Result<String>> + Send + 'static,
{
    let (splitter, paragraphs) = ParagraphSplitter::new(capacity);
    paragraphs.drive(async move {
        let mut tokens = Box::pin(tokens);
        while let Some(token) = tokens.next().await {
            splitter.on_token(&token?).await?;
        }
        Ok(())
    })
}

/// Remove every complete paragraph from the front of `buffer`.
///
/// Nothing is split while the buffer holds an odd number of fence markers.
fn take_paragraphs(buffer: &mut String) -> Vec<String> {
    let mut paragraphs = Vec::new();
    if buffer.matches(FENCE).count() % 2 == 1 {
        return paragraphs;
    }
    while let Some(at) = next_boundary(buffer) {
        let rest = buffer.split_off(at + PARAGRAPH_BREAK.len());
        buffer.truncate(at);
        paragraphs.push(std::mem::replace(buffer, rest));
    }
    paragraphs
}

/// Byte offset of the first paragraph break outside every fence that has
/// non-blank text before it.
fn next_boundary(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut in_fence = false;
    let mut i = 0;
    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(FENCE.as_bytes()) {
            in_fence = !in_fence;
            i += FENCE.len();
        } else if !in_fence
            && rest.starts_with(PARAGRAPH_BREAK.as_bytes())
            && !text[..i].trim().is_empty()
        {
            return Some(i);
        } else {
            i += 1;
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use futures_util::stream;

    fn drafts(replies: Vec<anyhow::Result<Reply>>) -> Vec<ReplyDraft> {
        replies
            .into_iter()
            .map(|r| match r.unwrap() {
                Reply::Compose(draft) => draft,
                Reply::Forward(_) => panic!("splitter never forwards"),
            })
            .collect()
    }

    fn token_stream(tokens: &[&str]) -> stream::Iter<std::vec::IntoIter<anyhow::Result<String>>> {
        let owned: Vec<anyhow::Result<String>> =
            tokens.iter().map(|t| Ok(t.to_string())).collect();
        stream::iter(owned)
    }

    #[tokio::test]
    async fn fenced_block_is_never_torn() {
        let tokens = [
            "Hello", " world", "\n\n", "Foo```bar", "\n\n", "```", "\n\n", "done",
        ];
        let out = drafts(split_token_stream(token_stream(&tokens), 64).collect().await);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0], ReplyDraft::interim("Hello world"));
        assert_eq!(out[1], ReplyDraft::interim("Foo```bar\n\n```"));
        assert_eq!(out[2], ReplyDraft::terminal("done"));
    }

    #[tokio::test]
    async fn paragraphs_rejoin_to_the_original_text() {
        let text = "Intro line\n\nA list:\n- one\n- two\n\n```rust\nfn main() {}\n\nfn other() {}\n```\n\n\n\nTail text\n\nend";
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut start = 0;
        let mut size = 1;
        while start < chars.len() {
            let end = (start + size).min(chars.len());
            tokens.push(chars[start..end].iter().collect::<String>());
            start = end;
            size = size % 5 + 1;
        }
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();

        let out = drafts(split_token_stream(token_stream(&refs), 64).collect().await);

        let (last, interim) = out.split_last().unwrap();
        assert!(!last.still_typing);
        assert!(interim.iter().all(|d| d.still_typing && !d.content.trim().is_empty()));
        let mut rejoined: Vec<&str> = interim.iter().map(|d| d.content.as_str()).collect();
        rejoined.push(&last.content);
        assert_eq!(rejoined.join("\n\n"), text);
        // The fenced block stayed in one piece.
        assert!(out.iter().any(|d| d.content.contains("fn main() {}\n\nfn other() {}")));
    }

    #[tokio::test]
    async fn unclosed_fence_is_flushed_at_end() {
        let tokens = ["Look:\n\n", "```", "py\nx = 1\n\n", "y = 2"];
        let out = drafts(split_token_stream(token_stream(&tokens), 64).collect().await);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].content, "Look:");
        assert_eq!(out[1], ReplyDraft::terminal("```py\nx = 1\n\ny = 2"));
    }

    #[tokio::test]
    async fn whitespace_tokens_only_accumulate() {
        let (splitter, paragraphs) = ParagraphSplitter::new(8);
        let mut replies = paragraphs.into_replies();

        splitter.on_token("First").await.unwrap();
        splitter.on_token("\n\n").await.unwrap();
        splitter.on_token("  ").await.unwrap();
        splitter.on_end().await.unwrap();

        let out = drafts(vec![replies.next().await.unwrap()]);
        // Padding never confirmed the break, so everything lands in one message.
        assert_eq!(out[0], ReplyDraft::terminal("First\n\n  "));
        assert!(replies.next().await.is_none());
    }

    #[tokio::test]
    async fn end_flushes_exactly_once() {
        let (splitter, paragraphs) = ParagraphSplitter::new(8);
        let replies = paragraphs.into_replies();

        splitter.on_token("only").await.unwrap();
        splitter.on_end().await.unwrap();
        splitter.on_end().await.unwrap();
        splitter.on_token("late").await.unwrap();
        drop(splitter);

        let out = drafts(replies.collect().await);
        assert_eq!(out, vec![ReplyDraft::terminal("only")]);
    }

    #[tokio::test]
    async fn producer_error_reaches_reader_after_earlier_paragraphs() {
        let tokens = stream::iter(vec![
            Ok("Hello\n\n".to_string()),
            Ok("World".to_string()),
            Err(anyhow::anyhow!("backend unavailable")),
        ]);
        let items: Vec<_> = split_token_stream(tokens, 64).collect().await;

        assert_eq!(items.len(), 2);
        match &items[0] {
            Ok(Reply::Compose(draft)) => assert_eq!(draft, &ReplyDraft::interim("Hello")),
            other => panic!("unexpected item {other:?}"),
        }
        let err = items[1].as_ref().unwrap_err();
        assert_eq!(err.to_string(), "backend unavailable");
    }

    #[tokio::test]
    async fn panicking_producer_is_reported() {
        async fn explode() -> anyhow::Result<()> {
            panic!("kaboom")
        }

        let (_splitter, paragraphs) = ParagraphSplitter::new(8);
        let items: Vec<_> = paragraphs.drive(explode()).collect().await;

        assert_eq!(items.len(), 1);
        assert!(items[0].as_ref().unwrap_err().to_string().contains("panicked"));
    }

    #[tokio::test]
    async fn small_queue_preserves_order() {
        let (splitter, paragraphs) = ParagraphSplitter::new(1);
        let replies = paragraphs.drive(async move {
            for i in 0..10 {
                splitter.on_token(&format!("p{i}\n\n")).await?;
            }
            Ok(())
        });

        let out = drafts(replies.collect().await);
        let contents: Vec<String> = out.iter().map(|d| d.content.clone()).collect();
        let mut expected: Vec<String> = (0..10).map(|i| format!("p{i}")).collect();
        expected.push(String::new());
        assert_eq!(contents, expected);
        assert!(out[..10].iter().all(|d| d.still_typing));
        assert!(!out[10].still_typing);
    }

    #[tokio::test]
    async fn producer_waits_for_first_read() {
        let fed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fed);
        let (splitter, paragraphs) = ParagraphSplitter::new(8);
        let mut replies = paragraphs.drive(async move {
            for token in ["one", " two", "\n\n", "three", " four"] {
                counter.fetch_add(1, Ordering::SeqCst);
                splitter.on_token(token).await?;
            }
            Ok(())
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fed.load(Ordering::SeqCst), 0);

        let first = replies.next().await.unwrap().unwrap();
        assert!(matches!(first, Reply::Compose(d) if d.content == "one two"));
        assert!(fed.load(Ordering::SeqCst) >= 4);
    }

    #[test]
    fn unread_stream_needs_no_runtime() {
        let (splitter, paragraphs) = ParagraphSplitter::new(1);
        let replies = paragraphs.drive(async move {
            splitter.on_token("never").await?;
            Ok(())
        });
        drop(replies);
    }

    #[tokio::test]
    async fn dropping_reader_aborts_producer() {
        struct SetOnDrop(Arc<AtomicBool>);
        impl Drop for SetOnDrop {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let stopped = Arc::new(AtomicBool::new(false));
        let flag = SetOnDrop(Arc::clone(&stopped));
        let (splitter, paragraphs) = ParagraphSplitter::new(4);
        let mut replies = paragraphs.drive(async move {
            let _flag = flag;
            splitter.on_token("first\n\n").await?;
            splitter.on_token("second").await?;
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });

        let first = replies.next().await.unwrap().unwrap();
        assert!(matches!(first, Reply::Compose(d) if d.content == "first"));
        drop(replies);

        tokio::time::timeout(Duration::from_secs(1), async {
            while !stopped.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn tokens_from_a_backend_thread() {
        let (splitter, paragraphs) = ParagraphSplitter::new(2);
        let backend = std::thread::spawn(move || {
            for token in ["one", "\n\n", "two", "\n\n", "three"] {
                splitter.blocking_on_token(token).unwrap();
            }
            splitter.blocking_on_end().unwrap();
        });

        let out = drafts(paragraphs.into_replies().collect().await);
        backend.join().unwrap();

        assert_eq!(
            out,
            vec![
                ReplyDraft::interim("one"),
                ReplyDraft::interim("two"),
                ReplyDraft::terminal("three"),
            ]
        );
    }

    #[test]
    fn odd_fence_count_suspends_splitting() {
        let mut buffer = "a\n\n```\nb\n\nc".to_string();
        assert!(take_paragraphs(&mut buffer).is_empty());
        assert_eq!(buffer, "a\n\n```\nb\n\nc");
    }

    #[test]
    fn boundaries_inside_fences_are_skipped() {
        let mut buffer = "```\nx\n\ny\n```\n\nz".to_string();
        assert_eq!(take_paragraphs(&mut buffer), vec!["```\nx\n\ny\n```"]);
        assert_eq!(buffer, "z");
    }

    #[test]
    fn blank_prefix_is_not_a_paragraph() {
        let mut buffer = "\n\n\n\nA".to_string();
        assert!(take_paragraphs(&mut buffer).is_empty());

        let mut buffer = "A\n\n\n\nB\n\nC".to_string();
        assert_eq!(take_paragraphs(&mut buffer), vec!["A", "\n\nB"]);
        assert_eq!(buffer, "C");
    }
}
