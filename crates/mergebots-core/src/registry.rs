//! Bot registry: handle -> participant profile + handler.
//!
//! The registry is an explicit object shared through `Arc`. Registering a
//! handle twice replaces the earlier entry (last registration wins) but keeps
//! the bot's participant id and its position in [`BotRegistry::list`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use mergebots_types::participant::Participant;

use crate::fulfillment::{BotHandler, FulfillmentError};

/// A registered bot: its participant identity and its handler.
pub struct RegisteredBot {
    pub handle: String,
    pub profile: Participant,
    pub handler: Arc<dyn BotHandler>,
}

impl std::fmt::Debug for RegisteredBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredBot")
            .field("handle", &self.handle)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

pub type BotRef = Arc<RegisteredBot>;

struct Slot {
    position: u64,
    bot: BotRef,
}

#[derive(Default)]
pub struct BotRegistry {
    bots: DashMap<String, Slot>,
    next_position: AtomicU64,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `handle`, replacing any earlier registration.
    pub fn register<H>(
        &self,
        handle: impl Into<String>,
        description: impl Into<String>,
        handler: H,
    ) -> BotRef
    where
        H: BotHandler + 'static,
    {
        let handle = handle.into();
        let mut profile = Participant::bot(handle.clone(), description);
        let handler: Arc<dyn BotHandler> = Arc::new(handler);

        match self.bots.entry(handle.clone()) {
            Entry::Occupied(mut slot) => {
                // Keep the identity so earlier messages still resolve to this bot.
                profile.id = slot.get().bot.profile.id;
                let bot = Arc::new(RegisteredBot {
                    handle: handle.clone(),
                    profile,
                    handler,
                });
                slot.get_mut().bot = Arc::clone(&bot);
                debug!(bot.handle = %handle, "replaced bot registration");
                bot
            }
            Entry::Vacant(slot) => {
                let bot = Arc::new(RegisteredBot {
                    handle: handle.clone(),
                    profile,
                    handler,
                });
                slot.insert(Slot {
                    position: self.next_position.fetch_add(1, Ordering::Relaxed),
                    bot: Arc::clone(&bot),
                });
                debug!(bot.handle = %handle, "registered bot");
                bot
            }
        }
    }

    pub fn lookup(&self, handle: &str) -> Result<BotRef, FulfillmentError> {
        self.get(handle)
            .ok_or_else(|| FulfillmentError::NotFound(handle.to_string()))
    }

    pub fn get(&self, handle: &str) -> Option<BotRef> {
        self.bots.get(handle).map(|slot| Arc::clone(&slot.bot))
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.bots.contains_key(handle)
    }

    /// All bots in order of first registration.
    pub fn list(&self) -> Vec<BotRef> {
        let mut slots: Vec<(u64, BotRef)> = self
            .bots
            .iter()
            .map(|slot| (slot.position, Arc::clone(&slot.bot)))
            .collect();
        slots.sort_by_key(|(position, _)| *position);
        slots.into_iter().map(|(_, bot)| bot).collect()
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

impl std::fmt::Debug for BotRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handles: Vec<String> = self.list().iter().map(|b| b.handle.clone()).collect();
        f.debug_struct("BotRegistry")
            .field("bots", &handles)
            .finish()
    }
}
