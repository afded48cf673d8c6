//! Participant message handlers

use super::Session;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{ItemIndex, Score};
use std::sync::Arc;

pub async fn handle_submit_vote(
    state: &Arc<AppState>,
    session: &Session,
    item: ItemIndex,
    score: Score,
) -> Option<ServerMessage> {
    tracing::info!(
        "Vote: lobby={}, voter={}, item={}, score={}",
        session.code,
        session.username,
        item,
        score
    );

    match state
        .submit_vote(&session.code, item, &session.username, score)
        .await
    {
        Ok(outcome) => Some(ServerMessage::VoteAck { item, outcome }),
        Err(e) => {
            tracing::debug!("Vote rejected: {}", e.code());
            Some(ServerMessage::error(&e))
        }
    }
}
