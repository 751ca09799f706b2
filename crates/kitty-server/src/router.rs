//! Axum router construction for the game server.
//!
//! Assembles the game `WebSocket` and the status endpoints into a single
//! [`Router`] with CORS enabled so browser clients on other origins can
//! connect.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET {game_path}` and `GET {game_path}/` -- game `WebSocket`
/// - `GET /api/state` -- current snapshot and pending timer
/// - `GET /api/actions` -- accepted action names
/// - `GET /health` -- liveness probe
///
/// Anything else gets a JSON 404.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let game_path = state.game_path.clone();
    let game_path_slash = format!("{game_path}/");

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route(&game_path, get(ws::ws_game))
        .route(&game_path_slash, get(ws::ws_game))
        // REST API
        .route("/api/state", get(handlers::get_state))
        .route("/api/actions", get(handlers::list_actions))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
