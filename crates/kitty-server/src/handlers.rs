//! REST endpoint handlers for the game server.
//!
//! Read-only views over the shared [`AppState`]. The game itself is
//! played over the `WebSocket`; these exist for status pages and probes.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/state` | Current snapshot, pending timer, client count |
//! | `GET` | `/api/actions` | Action names the server accepts |
//! | `GET` | `/health` | Liveness probe |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::Uri;
use axum::response::{Html, IntoResponse};
use kitty_types::{PetSnapshot, PetState};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// The autonomous transition currently scheduled.
#[derive(Debug, Clone, Serialize)]
pub struct PendingView {
    /// State the timer will move to.
    pub target: PetState,
    /// Whole seconds until it fires.
    pub remaining_secs: u64,
}

/// Body of `GET /api/state`.
#[derive(Debug, Clone, Serialize)]
pub struct StateResponse {
    /// Current state, recent events, and last nap.
    #[serde(flatten)]
    pub snapshot: PetSnapshot,
    /// Scheduled autonomous transition, if any.
    pub pending: Option<PendingView>,
    /// Live `WebSocket` connections.
    pub clients: usize,
}

/// Body of `GET /api/actions`.
#[derive(Debug, Clone, Serialize)]
pub struct ActionsResponse {
    /// Registered action names, sorted.
    pub actions: Vec<String>,
}

/// Usernames come straight from clients.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page with the kitty's status.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.machine.snapshot();
    let kitty_state = snapshot.state;
    let clients = state.connection_count();
    let game_path = &state.game_path;
    let events: String = snapshot
        .events
        .iter()
        .rev()
        .map(|e| format!("<li>{} &larr; {}</li>", e.state, escape_html(&e.username)))
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Kitty</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 640px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; }}
        .state {{ color: #3fb950; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
    </style>
</head>
<body>
    <h1>Kitty</h1>
    <p>State: <span class="state">{kitty_state}</span></p>
    <p>Connected players: {clients}</p>
    <p>Game socket: <code>{game_path}</code></p>
    <h2>Recent events</h2>
    <ul>{events}</ul>
    <p><a href="/api/state">/api/state</a> &middot; <a href="/api/actions">/api/actions</a></p>
</body>
</html>"#
    ))
}

/// `GET /api/state`
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    let (snapshot, pending) = {
        let session = state.machine.lock();
        (session.snapshot(), session.pending_transition())
    };

    Json(StateResponse {
        snapshot,
        pending: pending.map(|p| PendingView {
            target: p.target,
            remaining_secs: p.remaining().as_secs(),
        }),
        clients: state.connection_count(),
    })
}

/// `GET /api/actions`
pub async fn list_actions(State(state): State<Arc<AppState>>) -> Json<ActionsResponse> {
    Json(ActionsResponse {
        actions: state
            .registry
            .valid_actions()
            .into_iter()
            .map(str::to_owned)
            .collect(),
    })
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Fallback for unmatched routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_owned())
}
