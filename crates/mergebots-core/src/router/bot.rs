//! RouterBot -- answers by handing the inbound message to another bot.
//!
//! The router never writes the answer itself. It asks a classifier which
//! registered bot fits the conversation, fulfills the *same* inbound message
//! with that bot and forwards every message it produces, so history is never
//! duplicated and the originator is preserved.

use async_stream::try_stream;
use futures_util::StreamExt;
use tracing::{info, warn};

use mergebots_types::config::RouterConfig;
use mergebots_types::message::MessageRef;

use crate::fulfillment::{BotHandler, FulfillmentContext, Reply, ReplyStream};

use super::box_classifier::BoxClassifier;
use super::classifier::{Candidate, Classifier, normalize_choice};

/// Notice sent instead of routing when there is nothing to route.
pub const CONVERSATION_RESTARTED: &str = "```\nCONVERSATION RESTARTED\n```";

#[derive(Debug, Clone)]
pub struct RouterBot {
    classifier: BoxClassifier,
    default_handle: String,
    announce_choice: bool,
}

impl RouterBot {
    pub fn new<C: Classifier + 'static>(classifier: C, default_handle: impl Into<String>) -> Self {
        Self {
            classifier: BoxClassifier::new(classifier),
            default_handle: default_handle.into(),
            announce_choice: false,
        }
    }

    pub fn from_config<C: Classifier + 'static>(classifier: C, config: &RouterConfig) -> Self {
        Self::new(classifier, config.default_handle.clone())
            .with_announcement(config.announce_choice)
    }

    /// Tell humans (not bots) which bot was chosen before its answer.
    pub fn with_announcement(mut self, announce: bool) -> Self {
        self.announce_choice = announce;
        self
    }

    pub fn default_handle(&self) -> &str {
        &self.default_handle
    }
}

impl BotHandler for RouterBot {
    fn fulfill(&self, ctx: FulfillmentContext) -> ReplyStream {
        let classifier = self.classifier.clone();
        let default_handle = self.default_handle.clone();
        let announce = self.announce_choice;

        Box::pin(try_stream! {
            let conversation = ctx.conversation();
            if conversation.is_empty() {
                yield Reply::service_final(CONVERSATION_RESTARTED);
            } else {
                let candidates: Vec<Candidate> = ctx
                    .engine()
                    .registry()
                    .list()
                    .into_iter()
                    .filter(|bot| bot.handle != ctx.bot().handle)
                    .map(|bot| Candidate {
                        name: bot.handle.clone(),
                        description: bot.profile.description().unwrap_or_default().to_string(),
                    })
                    .collect();

                let transcript = format_transcript(&conversation);
                let chosen = match classifier.choose(&transcript, &candidates).await {
                    Ok(raw) => resolve_choice(&raw, &candidates, &default_handle),
                    Err(err) => {
                        warn!(error = %err, fallback = %default_handle, "classifier failed");
                        default_handle.clone()
                    }
                };
                info!(chosen = %chosen, "routing");

                if announce {
                    yield Reply::service(format!("`{chosen}`"));
                }

                let mut delegated = ctx.delegate(&chosen)?;
                while let Some(message) = delegated.next().await {
                    yield Reply::forward(message?);
                }
            }
        })
    }
}

/// Render a conversation the way routing classifiers read it: one
/// `USER:`/`ASSISTANT:` entry per message, separated by blank lines.
pub fn format_transcript(conversation: &[MessageRef]) -> String {
    conversation
        .iter()
        .map(|msg| {
            let role = if msg.is_sent_by_originator() {
                "USER"
            } else {
                "ASSISTANT"
            };
            format!("{role}: {}", msg.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn resolve_choice(raw: &str, candidates: &[Candidate], default_handle: &str) -> String {
    let choice = normalize_choice(raw);
    if candidates.iter().any(|c| c.name == choice) {
        choice
    } else {
        warn!(choice = %choice, fallback = %default_handle, "classifier chose an unknown bot");
        default_handle.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
