//! `WebSocket` handler for the shared game.
//!
//! Clients connect to the configured game path (default
//! `/kitty-game-server`, with or without a trailing slash). Each
//! connection:
//!
//! 1. receives `STATE_INIT` with the current state and recent events,
//! 2. receives every later `STATE_CHANGE` and `MESSAGE` via the shared
//!    [`broadcast`](tokio::sync::broadcast) channel,
//! 3. may send `{action, username}` frames, which are validated and
//!    dispatched to the action registry,
//! 4. gets a `PING` every liveness interval. A connection that stays
//!    silent for a whole interval after a probe is closed.
//!
//! If a client falls behind the broadcast buffer, lagged frames are
//! skipped and the client resumes from the most recent one.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use kitty_types::ServerMessage;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::InboundError;
use crate::state::AppState;

/// Upgrade an HTTP request to a game connection.
///
/// # Route
///
/// `GET {path_prefix}` and `GET {path_prefix}/`
pub async fn ws_game(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn send_frame(socket: &mut WebSocket, frame: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

/// Drive one connection until the client leaves, stops answering probes,
/// or the broadcast channel closes.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    let _connection = state.track_connection();
    info!(%connection_id, clients = state.connection_count(), "Client connected");

    let (init, mut rx) = state.join();
    if let Err(e) = send_frame(&mut socket, &init).await {
        debug!(%connection_id, "Failed to send STATE_INIT: {e}");
        return;
    }

    let mut probe = tokio::time::interval(state.ping_interval);
    probe.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    probe.tick().await;
    let mut heard_since_probe = true;

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(frame) => {
                        if send_frame(&mut socket, &frame).await.is_err() {
                            debug!(%connection_id, "Send failed, dropping client");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%connection_id, skipped, "Client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!(%connection_id, "Broadcast channel closed");
                        break;
                    }
                }
            }
            _ = probe.tick() => {
                if !heard_since_probe {
                    info!(%connection_id, "No reply since last PING, closing");
                    if let Err(e) = socket.send(Message::Close(None)).await {
                        debug!(%connection_id, "Close frame failed: {e}");
                    }
                    break;
                }
                heard_since_probe = false;
                if send_frame(&mut socket, &ServerMessage::Ping).await.is_err() {
                    debug!(%connection_id, "PING failed, dropping client");
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        heard_since_probe = true;
                        match state.handle_text(text.as_str()) {
                            Ok(message) => {
                                debug!(
                                    %connection_id,
                                    action = %message.action,
                                    username = %message.username,
                                    "Action dispatched"
                                );
                            }
                            Err(e) => warn!(%connection_id, error = %e, "Dropped client frame"),
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        heard_since_probe = true;
                        warn!(%connection_id, error = %InboundError::Binary, "Dropped client frame");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        heard_since_probe = true;
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%connection_id, "Pong failed, dropping client");
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => heard_since_probe = true,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(%connection_id, "WebSocket error: {e}");
                        break;
                    }
                }
            }
        }
    }

    info!(%connection_id, "Client disconnected");
}
