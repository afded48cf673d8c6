use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Remove idle lobbies once; returns how many were expired
pub async fn sweep_idle_lobbies(state: &AppState, max_idle: Duration) -> usize {
    match state.store.expire_idle(max_idle).await {
        Ok(expired) => {
            if !expired.is_empty() {
                tracing::info!("Expired {} idle lobbies: {:?}", expired.len(), expired);
            }
            expired.len()
        }
        Err(e) => {
            tracing::warn!("Lobby sweep failed: {}", e);
            0
        }
    }
}

/// Spawn a background task that periodically drops lobbies nobody has written to
pub fn spawn_lobby_reaper(state: Arc<AppState>) {
    let interval = state.config.sweep_interval;
    let max_idle = state.config.lobby_idle_ttl;

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            sweep_idle_lobbies(&state, max_idle).await;
        }
    });
}
