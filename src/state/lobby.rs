//! Lobby state machine: waiting -> voting -> finished.

use super::AppState;
use crate::error::{Action, LobbyError};
use crate::store::UpdateError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// How a vote submission affected the lobby
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoteOutcome {
    /// Lobby was not in the voting stage; nothing written
    Ignored,
    Recorded,
    /// Every participant voted; the next chocolate is up
    Advanced { to: ItemIndex },
    /// The last chocolate is complete
    Finished,
}

impl From<Transition> for VoteOutcome {
    fn from(t: Transition) -> Self {
        match t {
            Transition::Advanced { to } => VoteOutcome::Advanced { to },
            Transition::Finished => VoteOutcome::Finished,
            Transition::VoteRecorded => VoteOutcome::Recorded,
            _ => VoteOutcome::Ignored,
        }
    }
}

/// Owner-gated waiting -> voting
pub fn apply_start(lobby: &mut Lobby, name: &str) -> Result<Transition, LobbyError> {
    if !lobby.is_owner(name) {
        return Err(LobbyError::NotOwner);
    }
    match lobby.status {
        LobbyStatus::Waiting => {
            lobby.status = LobbyStatus::Voting;
            Ok(Transition::VotingStarted)
        }
        LobbyStatus::Voting => Ok(Transition::Unchanged),
        LobbyStatus::Finished => Err(LobbyError::InvalidTransition {
            from: LobbyStatus::Finished,
            to: LobbyStatus::Voting,
        }),
    }
}

/// Record a score and advance the round once every participant has voted.
///
/// A vote for an earlier item than the current one still overwrites that
/// item's score; completion is always judged on the current item.
pub fn apply_vote(
    lobby: &mut Lobby,
    item: ItemIndex,
    name: &str,
    score: Score,
) -> Result<Transition, LobbyError> {
    if lobby.status != LobbyStatus::Voting {
        return Ok(Transition::Unchanged);
    }
    if !lobby.is_participant(name) {
        return Err(LobbyError::NotParticipant);
    }
    if item > lobby.current_chocolate {
        return Err(LobbyError::InvalidItem(item));
    }

    lobby
        .votes
        .entry(item)
        .or_default()
        .insert(name.to_string(), score);

    let current = lobby.current_chocolate;
    if !lobby.all_voted(current) {
        return Ok(Transition::VoteRecorded);
    }

    if current >= LAST_ITEM {
        lobby.status = LobbyStatus::Finished;
        Ok(Transition::Finished)
    } else {
        lobby.current_chocolate = current + 1;
        Ok(Transition::Advanced { to: current + 1 })
    }
}

fn check_vote_input(item: ItemIndex, score: Score) -> Result<(), LobbyError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(LobbyError::InvalidScore(score));
    }
    if item > LAST_ITEM {
        return Err(LobbyError::InvalidItem(item));
    }
    Ok(())
}

fn update_error(action: Action, e: UpdateError) -> LobbyError {
    match e {
        UpdateError::Rejected(e) => e,
        UpdateError::Store(e) => LobbyError::store(action, e),
    }
}

impl AppState {
    /// Read the lobby document once
    pub async fn get_lobby(&self, code: &str) -> Result<Lobby, LobbyError> {
        self.store
            .read_once(code)
            .await
            .map_err(|e| LobbyError::store(Action::Load, e))?
            .ok_or(LobbyError::NotFound)
    }

    /// Live updates for a lobby
    pub async fn subscribe_lobby(
        &self,
        code: &str,
    ) -> Result<broadcast::Receiver<Lobby>, LobbyError> {
        match self.store.subscribe(code).await {
            Ok(rx) => Ok(rx),
            Err(crate::error::StoreError::Missing(_)) => Err(LobbyError::NotFound),
            Err(e) => Err(LobbyError::store(Action::Load, e)),
        }
    }

    /// Start voting; only the owner may do this
    pub async fn start_voting(&self, code: &str, name: &str) -> Result<Lobby, LobbyError> {
        let name = name.to_string();
        let (lobby, transition) = self
            .store
            .update(code, Box::new(move |lobby: &mut Lobby| apply_start(lobby, &name)))
            .await
            .map_err(|e| update_error(Action::StartVoting, e))?;

        if transition == Transition::VotingStarted {
            tracing::info!("Voting started in lobby {}", code);
        }
        Ok(lobby)
    }

    /// Submit a 1-5 score for `item`.
    ///
    /// The write, the completion check and the advance commit as one
    /// transaction, so simultaneous final votes advance exactly once.
    pub async fn submit_vote(
        &self,
        code: &str,
        item: ItemIndex,
        name: &str,
        score: Score,
    ) -> Result<VoteOutcome, LobbyError> {
        check_vote_input(item, score)?;

        let voter = name.to_string();
        let (lobby, transition) = self
            .store
            .update(
                code,
                Box::new(move |lobby: &mut Lobby| apply_vote(lobby, item, &voter, score)),
            )
            .await
            .map_err(|e| update_error(Action::Vote, e))?;

        match transition {
            Transition::Advanced { to } => {
                tracing::info!("Lobby {} advanced to chocolate #{}", code, to + 1)
            }
            Transition::Finished => tracing::info!("Lobby {} finished voting", code),
            Transition::Unchanged => {
                tracing::debug!(
                    "Vote by {} ignored, lobby {} is {:?}",
                    name,
                    code,
                    lobby.status
                )
            }
            _ => tracing::debug!("Vote by {} on #{} in lobby {}", name, item + 1, code),
        }

        Ok(transition.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn voting_lobby(names: &[&str]) -> Lobby {
        let mut lobby = Lobby::new("AB12CD".to_string(), names[0].to_string());
        for name in &names[1..] {
            lobby.participants.insert(name.to_string(), true);
        }
        lobby.status = LobbyStatus::Voting;
        lobby
    }

    #[test]
    fn test_start_requires_owner() {
        let mut lobby = Lobby::new("AB12CD".to_string(), "Ayşe".to_string());
        lobby.participants.insert("Mehmet".to_string(), true);

        assert_eq!(apply_start(&mut lobby, "Mehmet"), Err(LobbyError::NotOwner));
        assert_eq!(lobby.status, LobbyStatus::Waiting);

        assert_eq!(apply_start(&mut lobby, "Ayşe"), Ok(Transition::VotingStarted));
        assert_eq!(lobby.status, LobbyStatus::Voting);
        assert_eq!(lobby.current_chocolate, 0);
    }

    #[test]
    fn test_start_never_goes_backward() {
        let mut lobby = voting_lobby(&["Ayşe"]);
        assert_eq!(apply_start(&mut lobby, "Ayşe"), Ok(Transition::Unchanged));

        lobby.status = LobbyStatus::Finished;
        assert!(matches!(
            apply_start(&mut lobby, "Ayşe"),
            Err(LobbyError::InvalidTransition { .. })
        ));
        assert_eq!(lobby.status, LobbyStatus::Finished);
    }

    #[test]
    fn test_vote_ignored_unless_voting() {
        let mut lobby = Lobby::new("AB12CD".to_string(), "Ayşe".to_string());
        assert_eq!(
            apply_vote(&mut lobby, 0, "Ayşe", 3),
            Ok(Transition::Unchanged)
        );
        assert!(lobby.votes.is_empty());
    }

    #[test]
    fn test_two_participants_advance_item() {
        let mut lobby = voting_lobby(&["Ayşe", "Mehmet"]);

        assert_eq!(
            apply_vote(&mut lobby, 0, "Ayşe", 4),
            Ok(Transition::VoteRecorded)
        );
        assert_eq!(lobby.current_chocolate, 0);

        assert_eq!(
            apply_vote(&mut lobby, 0, "Mehmet", 5),
            Ok(Transition::Advanced { to: 1 })
        );
        assert_eq!(lobby.current_chocolate, 1);
        assert_eq!(lobby.status, LobbyStatus::Voting);
    }

    #[test]
    fn test_single_participant_finishes_on_last_item() {
        let mut lobby = voting_lobby(&["Ayşe"]);
        lobby.current_chocolate = LAST_ITEM;

        assert_eq!(apply_vote(&mut lobby, 4, "Ayşe", 2), Ok(Transition::Finished));
        assert_eq!(lobby.status, LobbyStatus::Finished);
        assert_eq!(lobby.current_chocolate, LAST_ITEM);
    }

    #[test]
    fn test_revote_overwrites() {
        let mut lobby = voting_lobby(&["Ayşe", "Mehmet"]);
        apply_vote(&mut lobby, 0, "Ayşe", 1).unwrap();
        apply_vote(&mut lobby, 0, "Ayşe", 5).unwrap();
        assert_eq!(lobby.vote_of(0, "Ayşe"), Some(5));
        assert_eq!(lobby.votes[&0].len(), 1);
    }

    #[test]
    fn test_stale_vote_does_not_advance() {
        let mut lobby = voting_lobby(&["Ayşe", "Mehmet"]);
        apply_vote(&mut lobby, 0, "Ayşe", 3).unwrap();
        apply_vote(&mut lobby, 0, "Mehmet", 3).unwrap();
        assert_eq!(lobby.current_chocolate, 1);

        // Late re-vote on item 0 lands but item 1 is still open
        assert_eq!(
            apply_vote(&mut lobby, 0, "Mehmet", 1),
            Ok(Transition::VoteRecorded)
        );
        assert_eq!(lobby.vote_of(0, "Mehmet"), Some(1));
        assert_eq!(lobby.current_chocolate, 1);
    }

    #[test]
    fn test_vote_rejections() {
        let mut lobby = voting_lobby(&["Ayşe"]);
        assert_eq!(
            apply_vote(&mut lobby, 0, "Stranger", 3),
            Err(LobbyError::NotParticipant)
        );
        assert_eq!(
            apply_vote(&mut lobby, 2, "Ayşe", 3),
            Err(LobbyError::InvalidItem(2))
        );
    }

    #[test]
    fn test_vote_input_checks() {
        assert_eq!(check_vote_input(0, 0), Err(LobbyError::InvalidScore(0)));
        assert_eq!(check_vote_input(0, 6), Err(LobbyError::InvalidScore(6)));
        assert_eq!(check_vote_input(5, 3), Err(LobbyError::InvalidItem(5)));
        assert!(check_vote_input(4, 5).is_ok());
    }

    #[tokio::test]
    async fn test_full_round_through_store() {
        let state = AppState::new();
        let code = state.create_lobby("Ayşe").await.unwrap().code;
        state.join_lobby("Mehmet", &code).await.unwrap();
        state.start_voting(&code, "Ayşe").await.unwrap();

        for item in 0..LAST_ITEM {
            assert_eq!(
                state.submit_vote(&code, item, "Ayşe", 4).await.unwrap(),
                VoteOutcome::Recorded
            );
            assert_eq!(
                state.submit_vote(&code, item, "Mehmet", 5).await.unwrap(),
                VoteOutcome::Advanced { to: item + 1 }
            );
            let lobby = state.get_lobby(&code).await.unwrap();
            assert_eq!(lobby.current_chocolate, item + 1);
            assert_eq!(lobby.status, LobbyStatus::Voting);
        }

        state.submit_vote(&code, LAST_ITEM, "Ayşe", 1).await.unwrap();
        assert_eq!(
            state
                .submit_vote(&code, LAST_ITEM, "Mehmet", 2)
                .await
                .unwrap(),
            VoteOutcome::Finished
        );
        assert_eq!(
            state.get_lobby(&code).await.unwrap().status,
            LobbyStatus::Finished
        );

        // Finished lobbies ignore further votes
        assert_eq!(
            state.submit_vote(&code, 0, "Ayşe", 5).await.unwrap(),
            VoteOutcome::Ignored
        );
    }

    #[tokio::test]
    async fn test_non_owner_cannot_start() {
        let state = AppState::new();
        let code = state.create_lobby("Ayşe").await.unwrap().code;
        state.join_lobby("Mehmet", &code).await.unwrap();

        assert_eq!(
            state.start_voting(&code, "Mehmet").await.unwrap_err(),
            LobbyError::NotOwner
        );
        assert_eq!(
            state.get_lobby(&code).await.unwrap().status,
            LobbyStatus::Waiting
        );
    }

    #[tokio::test]
    async fn test_concurrent_final_votes_advance_once() {
        let state = Arc::new(AppState::new());
        let code = state.create_lobby("p0").await.unwrap().code;
        let names: Vec<String> = (1..8).map(|i| format!("p{}", i)).collect();
        for name in &names {
            state.join_lobby(name, &code).await.unwrap();
        }
        state.start_voting(&code, "p0").await.unwrap();

        let mut handles = Vec::new();
        for name in std::iter::once("p0".to_string()).chain(names) {
            let state = state.clone();
            let code = code.clone();
            handles.push(tokio::spawn(async move {
                state.submit_vote(&code, 0, &name, 3).await.unwrap()
            }));
        }

        let mut advanced = 0;
        for handle in handles {
            if let VoteOutcome::Advanced { .. } = handle.await.unwrap() {
                advanced += 1;
            }
        }
        assert_eq!(advanced, 1);
        assert_eq!(state.get_lobby(&code).await.unwrap().current_chocolate, 1);
    }

    #[tokio::test]
    async fn test_missing_lobby_actions() {
        let state = AppState::new();
        assert_eq!(
            state.get_lobby("ZZZZZZ").await.unwrap_err(),
            LobbyError::NotFound
        );
        assert_eq!(
            state.submit_vote("ZZZZZZ", 0, "a", 3).await.unwrap_err(),
            LobbyError::NotFound
        );
        assert_eq!(
            state.subscribe_lobby("ZZZZZZ").await.unwrap_err(),
            LobbyError::NotFound
        );
    }
}
