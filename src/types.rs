use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque ID types for readability
pub type LobbyCode = String;
pub type ParticipantName = String;
pub type ItemIndex = usize;
pub type Score = u8;

/// Number of chocolates voted on per lobby
pub const ITEM_COUNT: usize = 5;
/// Zero-based index of the last chocolate
pub const LAST_ITEM: ItemIndex = ITEM_COUNT - 1;

pub const MIN_SCORE: Score = 1;
pub const MAX_SCORE: Score = 5;

/// Lobby codes are six symbols drawn from A-Z and 0-9
pub const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const CODE_LENGTH: usize = 6;

pub const MAX_NAME_CHARS: usize = 32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LobbyStatus {
    Waiting,
    Voting,
    Finished,
}

/// The single document stored per lobby, keyed by its code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    pub id: LobbyCode,
    pub owner: ParticipantName,
    /// Participant set, stored as name -> true
    pub participants: BTreeMap<ParticipantName, bool>,
    pub status: LobbyStatus,
    pub current_chocolate: ItemIndex,
    /// item index -> (participant -> score)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub votes: BTreeMap<ItemIndex, BTreeMap<ParticipantName, Score>>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Lobby {
    /// Fresh lobby in the waiting state with the owner as its only participant
    pub fn new(id: LobbyCode, owner: ParticipantName) -> Self {
        let mut participants = BTreeMap::new();
        participants.insert(owner.clone(), true);
        Self {
            id,
            owner,
            participants,
            status: LobbyStatus::Waiting,
            current_chocolate: 0,
            votes: BTreeMap::new(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    pub fn is_owner(&self, name: &str) -> bool {
        self.owner == name
    }

    pub fn is_participant(&self, name: &str) -> bool {
        self.participants.get(name).copied().unwrap_or(false)
    }

    pub fn participant_names(&self) -> impl Iterator<Item = &ParticipantName> {
        self.participants
            .iter()
            .filter(|(_, joined)| **joined)
            .map(|(name, _)| name)
    }

    pub fn vote_of(&self, item: ItemIndex, name: &str) -> Option<Score> {
        self.votes.get(&item).and_then(|v| v.get(name)).copied()
    }

    /// Whether `name` already voted on the chocolate currently up
    pub fn has_voted(&self, name: &str) -> bool {
        self.vote_of(self.current_chocolate, name).is_some()
    }

    /// True once every participant has a vote recorded for `item`
    pub fn all_voted(&self, item: ItemIndex) -> bool {
        self.participant_names()
            .all(|name| self.vote_of(item, name).is_some())
    }

    /// Voting state of every participant for the current chocolate
    pub fn vote_progress(&self) -> Vec<VoteProgress> {
        self.participant_names()
            .map(|name| VoteProgress {
                participant: name.clone(),
                has_voted: self.has_voted(name),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteProgress {
    pub participant: ParticipantName,
    pub has_voted: bool,
}

/// What a committed (or declined) lobby mutation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing was written
    Unchanged,
    VotingStarted,
    VoteRecorded,
    Advanced { to: ItemIndex },
    Finished,
}

impl Transition {
    pub fn is_write(&self) -> bool {
        !matches!(self, Transition::Unchanged)
    }
}

/// One voter's score on an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoterScore {
    pub voter: ParticipantName,
    pub score: Score,
}

/// Aggregated outcome for one chocolate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemResult {
    /// Zero-based item index
    pub item: ItemIndex,
    /// Mean of the recorded scores; None when nobody voted on the item
    pub average: Option<f64>,
    pub voters: Vec<VoterScore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_progress_tracks_current_item() {
        let mut lobby = Lobby::new("AB12CD".to_string(), "Ayşe".to_string());
        lobby.participants.insert("Mehmet".to_string(), true);
        lobby.votes.entry(0).or_default().insert("Ayşe".to_string(), 4);

        assert!(lobby.has_voted("Ayşe"));
        assert!(!lobby.has_voted("Mehmet"));
        assert!(!lobby.all_voted(0));
        assert_eq!(
            lobby.vote_progress(),
            vec![
                VoteProgress {
                    participant: "Ayşe".to_string(),
                    has_voted: true
                },
                VoteProgress {
                    participant: "Mehmet".to_string(),
                    has_voted: false
                },
            ]
        );

        // Votes on item 0 say nothing about item 1
        lobby.current_chocolate = 1;
        assert!(!lobby.has_voted("Ayşe"));
    }

    #[test]
    fn test_lobby_document_shape() {
        let lobby = Lobby::new("AB12CD".to_string(), "Ayşe".to_string());
        let json = serde_json::to_value(&lobby).unwrap();

        assert_eq!(json["status"], "waiting");
        assert_eq!(json["currentChocolate"], 0);
        assert_eq!(json["participants"]["Ayşe"], true);
        // Empty vote map is omitted
        assert!(json.get("votes").is_none());
    }
}
