//! WebSocket message dispatch
//!
//! Owner-only actions are authorized here, then dispatched to the
//! role-specific handler modules.

use crate::error::{Action, LobbyError};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

use super::{owner, participant, Session};

/// Macro to check lobby ownership and return early if unauthorized.
///
/// Store failures report the action being gated, not a plain load.
macro_rules! check_owner {
    ($state:expr, $session:expr, $action:expr) => {
        match $state.store.read_once(&$session.code).await {
            Ok(Some(lobby)) if lobby.is_owner(&$session.username) => {}
            Ok(Some(_)) => return Some(ServerMessage::error(&LobbyError::NotOwner)),
            Ok(None) => return Some(ServerMessage::error(&LobbyError::NotFound)),
            Err(e) => return Some(ServerMessage::error(&LobbyError::store($action, e))),
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    session: &Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::StartVoting => {
            check_owner!(state, session, Action::StartVoting);
            owner::handle_start_voting(state, session).await
        }

        ClientMessage::SubmitVote { item, score } => {
            participant::handle_submit_vote(state, session, item, score).await
        }
    }
}
