//! Owner-only command handlers
//!
//! Ownership is checked in the dispatch layer before calling these.

use super::Session;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

pub async fn handle_start_voting(
    state: &Arc<AppState>,
    session: &Session,
) -> Option<ServerMessage> {
    tracing::info!("{} starting voting in lobby {}", session.username, session.code);
    match state.start_voting(&session.code, &session.username).await {
        Ok(lobby) => Some(ServerMessage::lobby(lobby)),
        Err(e) => Some(ServerMessage::error(&e)),
    }
}
