use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};

use super::{LobbyStore, LobbyUpdate, StorePath, StoreValue, UpdateError};
use crate::error::{LobbyError, StoreError, StoreResult};
use crate::types::*;

/// Buffered lobby versions per subscriber before it starts lagging
const SUBSCRIBER_CAPACITY: usize = 64;

struct Entry {
    lobby: Lobby,
    updates: broadcast::Sender<Lobby>,
    touched: Instant,
}

impl Entry {
    fn new(lobby: Lobby) -> Self {
        let (updates, _rx) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            lobby,
            updates,
            touched: Instant::now(),
        }
    }

    fn commit(&mut self) {
        self.touched = Instant::now();
        // No subscribers is fine
        let _ = self.updates.send(self.lobby.clone());
    }
}

/// In-process document store
#[derive(Clone, Default)]
pub struct MemoryStore {
    lobbies: Arc<RwLock<HashMap<LobbyCode, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.lobbies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lobbies.read().await.is_empty()
    }
}

fn mismatch(path: &StorePath, value: &StoreValue) -> StoreError {
    StoreError::TypeMismatch {
        path: path.to_string(),
        value: value.kind(),
    }
}

/// Apply a path write to an existing document
fn apply(lobby: &mut Lobby, path: &StorePath, value: StoreValue) -> StoreResult<()> {
    match (path, value) {
        (StorePath::Status(_), StoreValue::Status(status)) => lobby.status = status,
        (StorePath::Participant(_, name), StoreValue::Flag(joined)) => {
            lobby.participants.insert(name.clone(), joined);
        }
        (StorePath::Vote(_, item, name), StoreValue::Score(score)) => {
            lobby
                .votes
                .entry(*item)
                .or_default()
                .insert(name.clone(), score);
        }
        (StorePath::CurrentChocolate(_), StoreValue::Index(item)) => {
            lobby.current_chocolate = item
        }
        (path, value) => return Err(mismatch(path, &value)),
    }
    Ok(())
}

#[async_trait]
impl LobbyStore for MemoryStore {
    async fn read_once(&self, code: &str) -> StoreResult<Option<Lobby>> {
        Ok(self.lobbies.read().await.get(code).map(|e| e.lobby.clone()))
    }

    async fn write(&self, path: StorePath, value: StoreValue) -> StoreResult<()> {
        tracing::debug!(%path, kind = value.kind(), "Store write");
        let mut lobbies = self.lobbies.write().await;

        if let StorePath::Lobby(code) = &path {
            let lobby = match value {
                StoreValue::Lobby(lobby) => lobby,
                other => return Err(mismatch(&path, &other)),
            };
            // Whole documents are only ever created, never replaced
            if lobbies.contains_key(code) {
                return Err(StoreError::Exists(code.clone()));
            }
            let mut entry = Entry::new(lobby);
            entry.commit();
            lobbies.insert(code.clone(), entry);
            return Ok(());
        }

        let entry = lobbies
            .get_mut(path.code())
            .ok_or_else(|| StoreError::Missing(path.code().to_string()))?;
        apply(&mut entry.lobby, &path, value)?;
        entry.commit();
        Ok(())
    }

    async fn update(
        &self,
        code: &str,
        f: LobbyUpdate,
    ) -> Result<(Lobby, Transition), UpdateError> {
        let mut lobbies = self.lobbies.write().await;
        let entry = lobbies
            .get_mut(code)
            .ok_or(UpdateError::Rejected(LobbyError::NotFound))?;

        let mut draft = entry.lobby.clone();
        let transition = f(&mut draft).map_err(UpdateError::Rejected)?;

        if transition.is_write() {
            entry.lobby = draft;
            entry.commit();
        }
        Ok((entry.lobby.clone(), transition))
    }

    async fn subscribe(&self, code: &str) -> StoreResult<broadcast::Receiver<Lobby>> {
        self.lobbies
            .read()
            .await
            .get(code)
            .map(|e| e.updates.subscribe())
            .ok_or_else(|| StoreError::Missing(code.to_string()))
    }

    async fn expire_idle(&self, max_idle: Duration) -> StoreResult<Vec<LobbyCode>> {
        let mut lobbies = self.lobbies.write().await;
        let expired: Vec<LobbyCode> = lobbies
            .iter()
            .filter(|(_, e)| e.touched.elapsed() > max_idle)
            .map(|(code, _)| code.clone())
            .collect();

        // Dropping the entry drops its sender, which closes subscriptions
        for code in &expired {
            lobbies.remove(code);
        }
        Ok(expired)
    }
}
