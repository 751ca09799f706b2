//! Enumeration types for the Kitty game.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The pet's state.
///
/// Exactly one value is current at any time; it is shared by every
/// connected observer. On the wire the variants use their uppercase
/// names (`"VIBING"`, `"BEING_PET"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum PetState {
    /// Content and idle. Decays to [`PetState::Dying`] if ignored.
    Vibing,
    /// Someone is petting the kitty right now.
    BeingPet,
    /// Neglected for too long. Decays to [`PetState::Dead`].
    Dying,
    /// Terminal.
    Dead,
    /// Asleep. Wakes up on its own.
    Sleeping,
}

impl PetState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Vibing,
        Self::BeingPet,
        Self::Dying,
        Self::Dead,
        Self::Sleeping,
    ];

    /// The wire name of this state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vibing => "VIBING",
            Self::BeingPet => "BEING_PET",
            Self::Dying => "DYING",
            Self::Dead => "DEAD",
            Self::Sleeping => "SLEEPING",
        }
    }
}

impl fmt::Display for PetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
