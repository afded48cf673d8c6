//! Boundary to the realtime document store.
//!
//! Every lobby lives in one document at `lobbies/{code}`. The surfaces only
//! touch the store through [`LobbyStore`]: read once, write a value at a path,
//! subscribe to live changes, and run an atomic update transaction.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::error::{LobbyError, StoreError, StoreResult};
use crate::types::*;

/// Paths the application writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorePath {
    Lobby(LobbyCode),
    Status(LobbyCode),
    Participant(LobbyCode, ParticipantName),
    Vote(LobbyCode, ItemIndex, ParticipantName),
    CurrentChocolate(LobbyCode),
}

impl StorePath {
    /// Code of the lobby document this path points into
    pub fn code(&self) -> &str {
        match self {
            StorePath::Lobby(code)
            | StorePath::Status(code)
            | StorePath::Participant(code, _)
            | StorePath::Vote(code, _, _)
            | StorePath::CurrentChocolate(code) => code,
        }
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorePath::Lobby(code) => write!(f, "lobbies/{}", code),
            StorePath::Status(code) => write!(f, "lobbies/{}/status", code),
            StorePath::Participant(code, name) => {
                write!(f, "lobbies/{}/participants/{}", code, name)
            }
            StorePath::Vote(code, item, name) => {
                write!(f, "lobbies/{}/votes/{}/{}", code, item, name)
            }
            StorePath::CurrentChocolate(code) => write!(f, "lobbies/{}/currentChocolate", code),
        }
    }
}

/// Values that can be written at a [`StorePath`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Lobby(Lobby),
    Status(LobbyStatus),
    Flag(bool),
    Score(Score),
    Index(ItemIndex),
}

impl StoreValue {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreValue::Lobby(_) => "lobby",
            StoreValue::Status(_) => "status",
            StoreValue::Flag(_) => "flag",
            StoreValue::Score(_) => "score",
            StoreValue::Index(_) => "index",
        }
    }
}

/// Read-modify-write step run inside [`LobbyStore::update`].
///
/// Returning `Err` aborts without writing. `Ok(Transition::Unchanged)` also
/// writes nothing; any other transition commits the mutated document.
pub type LobbyUpdate = Box<dyn FnOnce(&mut Lobby) -> Result<Transition, LobbyError> + Send>;

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateError {
    /// The update closure declined the change
    Rejected(LobbyError),
    /// The store itself failed
    Store(StoreError),
}

impl From<StoreError> for UpdateError {
    fn from(e: StoreError) -> Self {
        UpdateError::Store(e)
    }
}

#[async_trait]
pub trait LobbyStore: Send + Sync {
    /// Fetch the current lobby document, if any
    async fn read_once(&self, code: &str) -> StoreResult<Option<Lobby>>;

    /// Write a single value at `path`.
    ///
    /// A whole document at [`StorePath::Lobby`] is only created: writing one
    /// over an existing code fails with [`StoreError::Exists`].
    async fn write(&self, path: StorePath, value: StoreValue) -> StoreResult<()>;

    /// Atomically apply `f` to the lobby document
    async fn update(
        &self,
        code: &str,
        f: LobbyUpdate,
    ) -> Result<(Lobby, Transition), UpdateError>;

    /// Receive every committed version of the lobby document.
    ///
    /// The receiver closes when the lobby is removed from the store.
    async fn subscribe(&self, code: &str) -> StoreResult<broadcast::Receiver<Lobby>>;

    /// Remove lobbies whose last write is older than `max_idle`
    async fn expire_idle(&self, max_idle: Duration) -> StoreResult<Vec<LobbyCode>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_render_store_layout() {
        let code = "AB12CD".to_string();
        assert_eq!(StorePath::Lobby(code.clone()).to_string(), "lobbies/AB12CD");
        assert_eq!(
            StorePath::Status(code.clone()).to_string(),
            "lobbies/AB12CD/status"
        );
        assert_eq!(
            StorePath::Participant(code.clone(), "Ayşe".to_string()).to_string(),
            "lobbies/AB12CD/participants/Ayşe"
        );
        assert_eq!(
            StorePath::Vote(code.clone(), 3, "Mehmet".to_string()).to_string(),
            "lobbies/AB12CD/votes/3/Mehmet"
        );
        assert_eq!(
            StorePath::CurrentChocolate(code).to_string(),
            "lobbies/AB12CD/currentChocolate"
        );
    }

    #[test]
    fn test_path_code() {
        let path = StorePath::Vote("ZZ99ZZ".to_string(), 0, "x".to_string());
        assert_eq!(path.code(), "ZZ99ZZ");
    }
}
