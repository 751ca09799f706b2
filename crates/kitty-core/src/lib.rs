//! Core game logic for the Kitty server.
//!
//! One shared pet, many observers. This crate owns the pet's state and the
//! rules for changing it; it knows nothing about sockets.
//!
//! # Architecture
//!
//! - [`state_machine`] -- [`StateMachine`] holds the current [`PetState`],
//!   the rolling history, and at most one pending autonomous timer. Every
//!   applied transition is reported to a [`TransitionObserver`].
//! - [`table`] -- The fixed decay/recovery policy ([`TransitionTable`]).
//! - [`actions`] -- [`ActionRegistry`] maps client action names to
//!   handlers that either transition or narrate a rejection.
//! - [`history`] -- The five-entry [`EventHistory`].
//! - [`config`] -- YAML configuration for the server binary.
//!
//! The transport layer supplies two capabilities: a [`TransitionObserver`]
//! that fans state changes out to every connection, and a [`Narrator`] that
//! does the same for rejection messages.
//!
//! [`PetState`]: kitty_types::PetState

pub mod actions;
pub mod config;
pub mod history;
pub mod state_machine;
pub mod table;

pub use actions::{ActionContext, ActionHandler, ActionRegistry, Narrator};
pub use config::{ConfigError, KittyConfig};
pub use history::{EventHistory, HISTORY_CAPACITY};
pub use state_machine::{
    NoOpObserver, PendingTransition, SessionGuard, SleepStamp, StateMachine, StateMachineError,
    TransitionObserver,
};
pub use table::{AutoTransition, TransitionTable};
