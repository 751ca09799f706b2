//! Error types for the game server.
//!
//! [`InboundError`] covers client frames that never reach the core.
//! [`ApiError`] is what the REST endpoints return; it converts into an
//! Axum response via [`IntoResponse`](axum::response::IntoResponse).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Why a client frame was dropped before dispatch.
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    /// Not a JSON `{action, username}` object.
    #[error("malformed client message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// No handler is registered under this name.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// The username was empty or whitespace.
    #[error("username must not be empty")]
    EmptyUsername,

    /// Binary frames are not part of the protocol.
    #[error("binary frames are not supported")]
    Binary,
}

/// Errors returned by the REST API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No route matched.
    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(path) => (StatusCode::NOT_FOUND, format!("no route for {path}")),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
