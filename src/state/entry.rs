//! Entry surface: minting lobbies and joining them by code.

use super::AppState;
use crate::error::{Action, LobbyError, StoreError};
use crate::store::{StorePath, StoreValue};
use crate::types::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters that cannot appear in a store path segment
const FORBIDDEN_NAME_CHARS: &[char] = &['/', '.', '#', '$', '[', ']'];

/// Generate a random lobby code (6 characters from A-Z0-9)
pub fn generate_lobby_code() -> LobbyCode {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Trim a display name and check it can be used as a participant key
pub fn validate_name(name: &str) -> Result<ParticipantName, LobbyError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LobbyError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_CHARS
        || name
            .chars()
            .any(|c| c.is_control() || FORBIDDEN_NAME_CHARS.contains(&c))
    {
        return Err(LobbyError::InvalidName);
    }
    Ok(name.to_string())
}

/// Upper-case a user-typed code and check its shape
pub fn normalize_code(code: &str) -> Result<LobbyCode, LobbyError> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(LobbyError::EmptyCode);
    }
    if code.len() != CODE_LENGTH || !code.bytes().all(|b| CODE_CHARS.contains(&b)) {
        return Err(LobbyError::MalformedCode);
    }
    Ok(code)
}

/// Where the lobby surface for `name` lives
pub fn lobby_url(code: &str, name: &str) -> String {
    format!("/lobby/{}?username={}", code, urlencoding::encode(name))
}

/// Result of a successful create or join
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedLobby {
    pub code: LobbyCode,
    pub lobby: Lobby,
    pub url: String,
}

impl AppState {
    /// Create a new lobby owned by `name`
    pub async fn create_lobby(&self, name: &str) -> Result<JoinedLobby, LobbyError> {
        let name = validate_name(name)?;

        // Draw until the store accepts the code (collisions are rare with 36^6 codes)
        let (code, lobby) = loop {
            let code = generate_lobby_code();
            let lobby = Lobby::new(code.clone(), name.clone());
            match self
                .store
                .write(StorePath::Lobby(code.clone()), StoreValue::Lobby(lobby.clone()))
                .await
            {
                Ok(()) => break (code, lobby),
                Err(StoreError::Exists(_)) => {
                    tracing::debug!("Lobby code collision on {}, drawing again", code);
                }
                Err(e) => return Err(LobbyError::store(Action::Create, e)),
            }
        };

        tracing::info!("Lobby {} created by {}", code, name);
        Ok(JoinedLobby {
            url: lobby_url(&code, &name),
            code,
            lobby,
        })
    }

    /// Add `name` to the participants of a waiting lobby
    pub async fn join_lobby(&self, name: &str, code: &str) -> Result<JoinedLobby, LobbyError> {
        if name.trim().is_empty() {
            return Err(LobbyError::EmptyName);
        }
        let code = normalize_code(code)?;
        let name = validate_name(name)?;

        let lobby = self
            .store
            .read_once(&code)
            .await
            .map_err(|e| LobbyError::store(Action::Join, e))?
            .ok_or(LobbyError::NotFound)?;

        if lobby.status != LobbyStatus::Waiting {
            tracing::info!("{} tried to join lobby {} in {:?}", name, code, lobby.status);
            return Err(LobbyError::CannotJoin);
        }

        let lobby = if lobby.is_participant(&name) {
            if self.config.reject_duplicate_names {
                return Err(LobbyError::NameTaken);
            }
            tracing::info!("{} rejoined lobby {}", name, code);
            lobby
        } else {
            self.store
                .write(
                    StorePath::Participant(code.clone(), name.clone()),
                    StoreValue::Flag(true),
                )
                .await
                .map_err(|e| match e {
                    // Expired between the read and the write
                    StoreError::Missing(_) => LobbyError::NotFound,
                    e => LobbyError::store(Action::Join, e),
                })?;
            tracing::info!("{} joined lobby {}", name, code);

            let mut lobby = lobby;
            lobby.participants.insert(name.clone(), true);
            lobby
        };

        Ok(JoinedLobby {
            url: lobby_url(&code, &name),
            code,
            lobby,
        })
    }
}
