use crate::state::{compute_results, VoteOutcome};
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Owner only
    StartVoting,
    SubmitVote {
        item: ItemIndex,
        score: Score,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        username: ParticipantName,
        is_owner: bool,
        lobby: Lobby,
        progress: Vec<VoteProgress>,
        #[serde(skip_serializing_if = "Option::is_none")]
        results: Option<Vec<ItemResult>>,
    },
    /// Sent on every change of the lobby document
    Lobby {
        lobby: Lobby,
        progress: Vec<VoteProgress>,
        #[serde(skip_serializing_if = "Option::is_none")]
        results: Option<Vec<ItemResult>>,
    },
    VoteAck {
        item: ItemIndex,
        outcome: VoteOutcome,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Results are only shown once voting has finished
fn finished_results(lobby: &Lobby) -> Option<Vec<ItemResult>> {
    (lobby.status == LobbyStatus::Finished).then(|| compute_results(lobby))
}

impl ServerMessage {
    pub fn welcome(username: &str, lobby: Lobby) -> Self {
        ServerMessage::Welcome {
            protocol: PROTOCOL_VERSION.to_string(),
            username: username.to_string(),
            is_owner: lobby.is_owner(username),
            progress: lobby.vote_progress(),
            results: finished_results(&lobby),
            lobby,
        }
    }

    pub fn lobby(lobby: Lobby) -> Self {
        ServerMessage::Lobby {
            progress: lobby.vote_progress(),
            results: finished_results(&lobby),
            lobby,
        }
    }

    pub fn error(e: &crate::error::LobbyError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}
