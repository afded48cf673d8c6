mod entry;
mod lobby;
mod results;

pub use entry::{generate_lobby_code, lobby_url, normalize_code, validate_name, JoinedLobby};
pub use lobby::{apply_start, apply_vote, VoteOutcome};
pub use results::compute_results;

use crate::config::AppConfig;
use crate::store::{LobbyStore, MemoryStore};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LobbyStore>,
    pub config: AppConfig,
}

impl AppState {
    /// State backed by a fresh in-memory store with default config
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    pub fn with_store(store: Arc<dyn LobbyStore>, config: AppConfig) -> Self {
        Self { store, config }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
