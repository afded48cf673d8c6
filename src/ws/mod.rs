pub mod handlers;
mod owner;
mod participant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::LobbyError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{normalize_code, validate_name, AppState};
use crate::types::{Lobby, LobbyCode, ParticipantName};

/// Lobby code and display name carried in the page URL
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub lobby: Option<String>,
    pub username: Option<String>,
}

/// Identity of one connected viewer
#[derive(Debug, Clone)]
pub struct Session {
    pub code: LobbyCode,
    pub username: ParticipantName,
}

impl Session {
    pub fn new(code: LobbyCode, username: ParticipantName) -> Self {
        Self { code, username }
    }

    fn from_query(params: &WsQuery) -> Result<Self, LobbyError> {
        let username = validate_name(params.username.as_deref().unwrap_or_default())?;
        let code = normalize_code(params.lobby.as_deref().unwrap_or_default())?;
        Ok(Self::new(code, username))
    }
}

/// What the socket does with one event from the lobby subscription
#[derive(Debug)]
enum Push {
    Send(ServerMessage),
    Skip,
    /// Send the message, then end the connection
    Close(ServerMessage),
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: lobby={:?}, username={:?}",
        params.lobby,
        params.username
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Serialize and send; false once the peer is gone
async fn send(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Validate the query, subscribe and build the welcome message.
///
/// On failure the returned error message is sent before the socket closes.
async fn open_session(
    params: &WsQuery,
    state: &AppState,
) -> Result<(Session, broadcast::Receiver<Lobby>, ServerMessage), ServerMessage> {
    let session = Session::from_query(params).map_err(|e| ServerMessage::error(&e))?;

    // Subscribe before reading so no update falls between the two
    let updates = state
        .subscribe_lobby(&session.code)
        .await
        .map_err(|e| ServerMessage::error(&e))?;
    let lobby = state
        .get_lobby(&session.code)
        .await
        .map_err(|e| ServerMessage::error(&e))?;

    let welcome = ServerMessage::welcome(&session.username, lobby);
    Ok((session, updates, welcome))
}

fn on_update(update: Result<Lobby, RecvError>, session: &Session) -> Push {
    match update {
        Ok(lobby) => Push::Send(ServerMessage::lobby(lobby)),
        Err(RecvError::Lagged(skipped)) => {
            tracing::warn!("Subscriber for {} lagged by {} updates", session.code, skipped);
            Push::Skip
        }
        // Lobby was removed from the store
        Err(RecvError::Closed) => Push::Close(ServerMessage::error(&LobbyError::NotFound)),
    }
}

/// Parse and dispatch one text frame
async fn on_text(
    text: &str,
    session: &Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    tracing::debug!("Received message: {}", text);

    match serde_json::from_str::<ClientMessage>(text) {
        Ok(client_msg) => handlers::handle_message(client_msg, session, state).await,
        Err(e) => {
            tracing::error!("Failed to parse client message: {}", e);
            Some(ServerMessage::Error {
                code: "PARSE_ERROR".to_string(),
                msg: format!("Invalid message format: {}", e),
            })
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (session, mut updates, welcome) = match open_session(&params, &state).await {
        Ok(opened) => opened,
        Err(error) => {
            send(&mut sender, &error).await;
            return;
        }
    };

    tracing::info!("{} connected to lobby {}", session.username, session.code);

    if !send(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    loop {
        tokio::select! {
            // Live lobby document
            update = updates.recv() => {
                match on_update(update, &session) {
                    Push::Send(msg) => {
                        if !send(&mut sender, &msg).await {
                            break;
                        }
                    }
                    Push::Skip => {}
                    Push::Close(msg) => {
                        send(&mut sender, &msg).await;
                        break;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(response) = on_text(text.as_str(), &session, &state).await {
                            if !send(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(
        "WebSocket connection closed for {} in lobby {}",
        session.username,
        session.code
    );
}
