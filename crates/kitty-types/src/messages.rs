//! JSON frames exchanged over the game `WebSocket`.
//!
//! Clients send [`ClientMessage`]; the server pushes [`ServerMessage`],
//! tagged by a `type` field.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::PetState;
use crate::structs::PetEvent;

/// An inbound request from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ClientMessage {
    /// The action name, e.g. `"PET"`.
    pub action: String,
    /// The name the client chose for itself.
    pub username: String,
}

/// An outbound frame pushed to one or all clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ServerMessage {
    /// Sent once to a newly connected client before anything else.
    StateInit {
        /// Current state.
        state: PetState,
        /// Rolling history, oldest first.
        events: Vec<PetEvent>,
    },
    /// A transition was applied.
    StateChange {
        /// The state entered.
        state: PetState,
        /// Who caused it.
        username: String,
    },
    /// Narration, usually explaining why an action was rejected.
    Message {
        /// Human-readable text.
        message: String,
    },
    /// Liveness probe. Clients answer with the `PONG` action.
    Ping,
}
