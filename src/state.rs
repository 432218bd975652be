//! Application state: exercise catalogue, progress store, feedback client and prompts.
//!
//! Built once at startup from env + optional TOML config. Everything mutable lives
//! behind the `ProgressStore` port; the catalogue itself is read-only.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::{load_app_config_from_env, Prompts};
use crate::domain::Catalog;
use crate::llm::{FeedbackService, Gemini};
use crate::ranks::RankTable;
use crate::seeds::{catalog_from, seed_pools};
use crate::store::{InMemoryStore, ProgressStore};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub store: Arc<dyn ProgressStore>,
    pub feedback: Option<Arc<dyn FeedbackService>>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, assemble pools and ranks, init the feedback client.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_default();

        let mut pools = seed_pools();
        cfg.apply_scenarios(&mut pools);
        let ranks = cfg.rank_table().unwrap_or_default();
        let catalog = catalog_from(pools, ranks);

        for pool in catalog.pools.values() {
            info!(target: "progress", exercise = %pool.exercise, kind = ?pool.kind, items = pool.len(), "Startup exercise inventory");
        }
        info!(target: "progress", ranks = catalog.ranks.ranks().len(), badges = catalog.badges.len(), "Startup gamification tables");

        let feedback: Option<Arc<dyn FeedbackService>> = match Gemini::from_env() {
            Some(g) => {
                info!(target: "counsel_backend", base_url = %g.base_url, model = %g.model, "Feedback service enabled.");
                Some(Arc::new(g))
            }
            None => {
                info!(target: "counsel_backend", "Feedback service disabled (GEMINI_API_KEY unset or client init failed). AI-evaluated exercises will be rejected.");
                None
            }
        };

        warn!(target: "counsel_backend", "Progress store is in-memory; user progress is lost on restart.");
        Self::new(catalog, Arc::new(InMemoryStore::default()), feedback, cfg.prompts)
    }

    pub fn new(
        catalog: Catalog,
        store: Arc<dyn ProgressStore>,
        feedback: Option<Arc<dyn FeedbackService>>,
        prompts: Prompts,
    ) -> Self {
        Self { catalog: Arc::new(catalog), store, feedback, prompts }
    }

    pub fn ranks(&self) -> &RankTable {
        &self.catalog.ranks
    }
}
