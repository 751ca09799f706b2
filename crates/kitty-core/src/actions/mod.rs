//! Action dispatch for client requests.
//!
//! An action name maps to an [`ActionHandler`]. Handlers inspect the
//! session through [`ActionContext::machine`] and either call
//! [`transition`](crate::state_machine::SessionGuard::transition) or narrate
//! a rejection through [`ActionContext::narrator`]. Rejections are not
//! errors.
//!
//! # Submodules
//!
//! - [`handlers`] -- The default `PET`, `PUT_TO_SLEEP` and `PONG` handlers.

pub mod handlers;

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::state_machine::StateMachine;

/// Capability to send narration text to every connected client.
///
/// The default handlers narrate after releasing the session lock, so an
/// implementation may read the [`StateMachine`]. Custom handlers must do
/// the same: narrating while holding a [`SessionGuard`] deadlocks any
/// narrator that reads the machine.
///
/// [`SessionGuard`]: crate::state_machine::SessionGuard
pub trait Narrator: Send + Sync {
    /// Broadcast `message` to all observers.
    fn broadcast_message(&self, message: &str);
}

impl<F> Narrator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn broadcast_message(&self, message: &str) {
        self(message);
    }
}

/// Everything a handler may touch.
#[derive(Clone, Copy)]
pub struct ActionContext<'a> {
    /// Who sent the action. Already validated as non-empty.
    pub actor: &'a str,
    /// The shared pet.
    pub machine: &'a StateMachine,
    /// Where rejection narration goes.
    pub narrator: &'a dyn Narrator,
}

impl<'a> ActionContext<'a> {
    /// Bundle a context.
    pub const fn new(actor: &'a str, machine: &'a StateMachine, narrator: &'a dyn Narrator) -> Self {
        Self {
            actor,
            machine,
            narrator,
        }
    }
}

impl fmt::Debug for ActionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("actor", &self.actor)
            .finish_non_exhaustive()
    }
}

/// Decision logic for one action.
///
/// Called without the session lock held. Take it once with
/// `ctx.machine.lock()` for the check and the transition, and drop the
/// guard before narrating. The session mutex is not reentrant: calling
/// [`StateMachine`] methods while holding a guard deadlocks.
pub trait ActionHandler: Send + Sync {
    /// Handle the action for `ctx.actor`.
    fn handle(&self, ctx: &ActionContext<'_>);
}

impl<F> ActionHandler for F
where
    F: Fn(&ActionContext<'_>) + Send + Sync,
{
    fn handle(&self, ctx: &ActionContext<'_>) {
        self(ctx);
    }
}

/// Name-to-handler table. Last registration for a name wins.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: BTreeMap<String, Box<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `PET`, `PUT_TO_SLEEP` and `PONG` registered.
    pub fn with_default_actions() -> Self {
        let mut registry = Self::new();
        registry.register(handlers::PET, handlers::pet);
        registry.register(handlers::PUT_TO_SLEEP, handlers::put_to_sleep);
        registry.register(handlers::PONG, handlers::pong);
        registry
    }

    /// Add or replace the handler for `action`.
    pub fn register(&mut self, action: impl Into<String>, handler: impl ActionHandler + 'static) {
        let action = action.into();
        if self.handlers.insert(action.clone(), Box::new(handler)).is_some() {
            debug!(%action, "Action handler replaced");
        }
    }

    /// Run the handler for `action`. Returns `false` (and does nothing) if
    /// no handler is registered under that name.
    pub fn dispatch(&self, action: &str, ctx: &ActionContext<'_>) -> bool {
        let Some(handler) = self.handlers.get(action) else {
            debug!(action, actor = ctx.actor, "No handler for action");
            return false;
        };
        handler.handle(ctx);
        true
    }

    /// Whether `action` has a handler.
    pub fn is_valid(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Registered action names, sorted.
    pub fn valid_actions(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.valid_actions())
            .finish()
    }
}
