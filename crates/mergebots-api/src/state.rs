//! Application state wiring the runtime together.

use std::path::PathBuf;
use std::sync::Arc;

use mergebots_core::fulfillment::FulfillmentEngine;
use mergebots_core::graph::MessageGraph;
use mergebots_core::registry::BotRegistry;
use mergebots_infra::config::{load_global_config, resolve_data_dir};
use mergebots_types::config::GlobalConfig;

use crate::demo::register_demo_bots;

/// Everything a command needs: configuration, the bots and the engine that
/// runs them against one shared message graph.
#[derive(Clone)]
pub struct AppState {
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
    pub registry: Arc<BotRegistry>,
    pub engine: FulfillmentEngine,
}

impl AppState {
    /// Load `config.toml` from the data directory and register the demo bots.
    pub async fn init() -> Self {
        let data_dir = resolve_data_dir();
        let config = load_global_config(&data_dir).await;
        Self::from_config(config, data_dir)
    }

    pub fn from_config(config: GlobalConfig, data_dir: PathBuf) -> Self {
        let registry = Arc::new(BotRegistry::new());
        register_demo_bots(&registry, &config);

        let engine = FulfillmentEngine::with_config(
            Arc::clone(&registry),
            Arc::new(MessageGraph::new()),
            config.engine.clone(),
            config.history.clone(),
        );

        Self {
            config,
            data_dir,
            registry,
            engine,
        }
    }
}
