//! History and snapshot structs shared between the core and the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::PetState;

/// Actor name recorded for autonomous (timer-driven) transitions.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// One entry in the rolling event history: who moved the pet into which
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PetEvent {
    /// The state that was entered.
    pub state: PetState,
    /// The actor that caused it (a username, or [`SYSTEM_ACTOR`]).
    pub username: String,
}

impl PetEvent {
    /// Create a history entry.
    pub fn new(state: PetState, username: impl Into<String>) -> Self {
        Self {
            state,
            username: username.into(),
        }
    }

    /// Whether this entry was produced by an autonomous transition.
    pub fn is_system(&self) -> bool {
        self.username == SYSTEM_ACTOR
    }
}

/// Point-in-time read model of the shared pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PetSnapshot {
    /// Current state.
    pub state: PetState,
    /// The most recent events, oldest first.
    pub events: Vec<PetEvent>,
    /// Wall-clock time the pet last fell asleep, if ever.
    pub last_time_slept: Option<DateTime<Utc>>,
}
