//! Bots that ship with the CLI.
//!
//! None of them call a model: EchoBot and ListenerBot answer in one message,
//! StreamBot pushes tokens through the paragraph splitter the way a
//! generative backend would, and RouterBot picks among the others.

use std::time::Duration;

use futures_util::stream;

use mergebots_core::fulfillment::{FulfillmentContext, Reply, ReplyStream};
use mergebots_core::registry::BotRegistry;
use mergebots_core::router::{KeywordClassifier, RouterBot};
use mergebots_core::streaming::ParagraphSplitter;
use mergebots_types::config::GlobalConfig;

pub const ROUTER_HANDLE: &str = "RouterBot";

const TOKEN_DELAY: Duration = Duration::from_millis(25);

/// Register EchoBot, ListenerBot, StreamBot and RouterBot.
pub fn register_demo_bots(registry: &BotRegistry, config: &GlobalConfig) {
    registry.register(
        "EchoBot",
        "Repeats your message back to you, reversed.",
        |ctx: FulfillmentContext| -> ReplyStream { single(echo(&ctx)) },
    );
    registry.register(
        "ListenerBot",
        "A patient listener, useful when the user needs to vent or talk about feelings.",
        |ctx: FulfillmentContext| -> ReplyStream { single(listen(&ctx)) },
    );

    let capacity = config.splitter.queue_capacity;
    registry.register(
        "StreamBot",
        "Streams a long answer paragraph by paragraph, with code examples.",
        move |ctx: FulfillmentContext| -> ReplyStream { stream_answer(ctx, capacity) },
    );

    registry.register(
        ROUTER_HANDLE,
        "Picks the best bot for the conversation.",
        RouterBot::from_config(KeywordClassifier, &config.router),
    );
}

fn single(text: String) -> ReplyStream {
    Box::pin(stream::iter([Ok(Reply::terminal(text))]))
}

fn echo(ctx: &FulfillmentContext) -> String {
    ctx.inbound().content.chars().rev().collect()
}

fn listen(ctx: &FulfillmentContext) -> String {
    let said = ctx
        .conversation()
        .iter()
        .filter(|m| m.is_sent_by_originator())
        .count();
    match said {
        0 | 1 => "I'm listening. Take your time.".to_string(),
        n => format!("I'm still here. That's {n} things you've shared so far. Go on."),
    }
}

fn stream_answer(ctx: FulfillmentContext, capacity: usize) -> ReplyStream {
    let text = compose_answer(&ctx.inbound().content);
    let (splitter, paragraphs) = ParagraphSplitter::new(capacity);

    paragraphs.drive(async move {
        for token in text.split_inclusive(' ') {
            if ctx.is_cancelled() {
                break;
            }
            splitter.on_token(token).await?;
            tokio::time::sleep(TOKEN_DELAY).await;
        }
        Ok(())
    })
}

fn compose_answer(question: &str) -> String {
    let words = question.split_whitespace().count();
    format!(
        "You asked something {words} words long. Here it is again, fenced:\n\n\
         ```\n{question}\n\n(blank lines inside a fence stay together)\n```\n\n\
         Each paragraph of this answer arrives as its own message.\n\n\
         That is all."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use futures_util::TryStreamExt;
    use mergebots_core::fulfillment::FulfillmentEngine;
    use mergebots_core::graph::MessageGraph;
    use mergebots_types::message::MessageRef;
    use mergebots_types::participant::Participant;

    fn engine() -> FulfillmentEngine {
        let registry = Arc::new(BotRegistry::new());
        register_demo_bots(&registry, &GlobalConfig::default());
        FulfillmentEngine::new(registry, Arc::new(MessageGraph::new()))
    }

    async fn ask(engine: &FulfillmentEngine, handle: &str, text: &str) -> Vec<MessageRef> {
        let inbound = engine
            .graph()
            .post(&Participant::human("alice"), text, true, None)
            .unwrap();
        engine
            .fulfill(handle, inbound)
            .unwrap()
            .try_collect()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn echo_bot_reverses() {
        let replies = ask(&engine(), "EchoBot", "hi").await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].content, "ih");
        assert!(replies[0].is_terminal());
    }

    #[tokio::test]
    async fn registers_all_demo_bots_in_order() {
        let engine = engine();
        let handles: Vec<String> = engine
            .registry()
            .list()
            .iter()
            .map(|b| b.handle.clone())
            .collect();
        assert_eq!(handles, ["EchoBot", "ListenerBot", "StreamBot", "RouterBot"]);
    }

    #[tokio::test]
    async fn stream_bot_keeps_fence_together() {
        let replies = ask(&engine(), "StreamBot", "show me\n\ncode").await;

        assert_eq!(replies.len(), 4);
        assert!(replies[1].content.starts_with("```"));
        assert!(replies[1].content.ends_with("```"));
        assert!(replies[1].content.contains("show me\n\ncode"));
        assert!(replies[..3].iter().all(|m| m.is_still_typing));
        assert_eq!(replies[3].content, "That is all.");
        assert!(replies[3].is_terminal());
    }

    #[tokio::test]
    async fn router_sends_venting_to_listener() {
        let replies = ask(&engine(), ROUTER_HANDLE, "I need to vent").await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].sender.handle(), Some("ListenerBot"));
    }

    #[tokio::test]
    async fn router_falls_back_to_echo() {
        let replies = ask(&engine(), ROUTER_HANDLE, "hello").await;
        assert_eq!(replies[0].sender.handle(), Some("EchoBot"));
        assert_eq!(replies[0].content, "olleh");
    }
}
