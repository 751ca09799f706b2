//! `WebSocket` game server for the shared Kitty.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Game `WebSocket`** (`/kitty-game-server` by default) where every
//!   client sees the same kitty and can send `PET` / `PUT_TO_SLEEP`
//! - **Status endpoints** (`/`, `/api/state`, `/api/actions`, `/health`)
//!
//! # Architecture
//!
//! One [`StateMachine`](kitty_core::StateMachine) lives in [`AppState`].
//! Its observer and the action handlers' narrator both publish into a
//! single [`tokio::sync::broadcast`] channel; each connection subscribes
//! on join and forwards frames to its socket. Clients that fall behind
//! skip ahead rather than stall the game.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::{ApiError, InboundError};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, Broadcaster, ConnectionGuard};
