//! Shared type definitions for the Kitty game server.
//!
//! Types defined here flow downstream to `TypeScript` via `ts-rs` for the
//! browser client.
//!
//! # Modules
//!
//! - [`enums`] -- The pet's [`PetState`]
//! - [`structs`] -- History entries and snapshots
//! - [`messages`] -- `WebSocket` frames in both directions

pub mod enums;
pub mod messages;
pub mod structs;

pub use enums::PetState;
pub use messages::{ClientMessage, ServerMessage};
pub use structs::{PetEvent, PetSnapshot, SYSTEM_ACTOR};
