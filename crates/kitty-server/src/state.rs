//! Shared application state for the game server.
//!
//! [`AppState`] owns the one [`StateMachine`], the [`ActionRegistry`], and
//! the broadcast channel every connection subscribes to. The machine's
//! observer and the handlers' narrator are both a [`Broadcaster`] over that
//! channel, so the core never sees a socket.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kitty_core::{
    ActionContext, ActionRegistry, KittyConfig, Narrator, StateMachine, StateMachineError,
    TransitionObserver, TransitionTable,
};
use kitty_types::{ClientMessage, PetState, ServerMessage};
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::InboundError;

/// Sends frames to every subscribed connection.
///
/// Used as the state machine's [`TransitionObserver`] (as `STATE_CHANGE`)
/// and as the handlers' [`Narrator`] (as `MESSAGE`).
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<ServerMessage>,
}

impl Broadcaster {
    /// Wrap a sender.
    pub const fn new(tx: broadcast::Sender<ServerMessage>) -> Self {
        Self { tx }
    }

    /// Publish to all subscribers.
    ///
    /// Returns the number of receivers. Zero connected clients is not an
    /// error.
    pub fn send(&self, message: ServerMessage) -> usize {
        // send only fails when nobody is subscribed.
        self.tx.send(message).unwrap_or(0)
    }
}

impl TransitionObserver for Broadcaster {
    fn on_transition(&self, state: PetState, actor: &str) {
        let receivers = self.send(ServerMessage::StateChange {
            state,
            username: actor.to_owned(),
        });
        trace!(%state, actor, receivers, "State change broadcast");
    }
}

impl Narrator for Broadcaster {
    fn broadcast_message(&self, message: &str) {
        let receivers = self.send(ServerMessage::Message {
            message: message.to_owned(),
        });
        trace!(receivers, "Narration broadcast");
    }
}

/// Shared state for the Axum application, injected as `State<Arc<AppState>>`.
#[derive(Debug)]
pub struct AppState {
    broadcaster: Broadcaster,
    /// The shared pet.
    pub machine: StateMachine,
    /// Action handlers available to clients.
    pub registry: ActionRegistry,
    /// Path the game `WebSocket` is mounted at.
    pub game_path: String,
    /// Time between liveness probes.
    pub ping_interval: Duration,
    connections: AtomicUsize,
}

impl AppState {
    /// Build the state from configuration with the default transition
    /// table and action set. Must run inside a Tokio runtime.
    pub fn new(config: &KittyConfig) -> Result<Self, StateMachineError> {
        Self::with_table(
            TransitionTable::default(),
            ActionRegistry::with_default_actions(),
            config,
        )
    }

    /// Build the state with an explicit table and registry.
    pub fn with_table(
        table: TransitionTable,
        registry: ActionRegistry,
        config: &KittyConfig,
    ) -> Result<Self, StateMachineError> {
        let (tx, _) = broadcast::channel(config.broadcast.capacity);
        let broadcaster = Broadcaster::new(tx);
        let machine = StateMachine::new(table, broadcaster.clone())?;
        Ok(Self {
            broadcaster,
            machine,
            registry,
            game_path: config.server.path_prefix.clone(),
            ping_interval: Duration::from_secs(config.liveness.ping_interval_secs),
            connections: AtomicUsize::new(0),
        })
    }

    /// Subscribe a new connection.
    ///
    /// Returns the `STATE_INIT` frame and a receiver for everything that
    /// happens afterwards. Both are taken under the session lock, so no
    /// transition can slip in between the snapshot and the subscription.
    pub fn join(&self) -> (ServerMessage, broadcast::Receiver<ServerMessage>) {
        let session = self.machine.lock();
        let rx = self.broadcaster.tx.subscribe();
        let init = ServerMessage::StateInit {
            state: session.state(),
            events: session.last_five_events(),
        };
        (init, rx)
    }

    /// Parse, validate and dispatch one text frame from a client.
    ///
    /// Returns the parsed message on success. Invalid frames never reach
    /// the registry.
    pub fn handle_text(&self, text: &str) -> Result<ClientMessage, InboundError> {
        let message: ClientMessage = serde_json::from_str(text)?;
        if message.username.trim().is_empty() {
            return Err(InboundError::EmptyUsername);
        }
        if !self.registry.is_valid(&message.action) {
            return Err(InboundError::UnknownAction(message.action));
        }

        let ctx = ActionContext::new(&message.username, &self.machine, &self.broadcaster);
        self.registry.dispatch(&message.action, &ctx);
        Ok(message)
    }

    /// Register a live connection. The count drops when the guard does.
    pub fn track_connection(&self) -> ConnectionGuard<'_> {
        self.connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard { state: self }
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

/// Keeps [`AppState::connection_count`] accurate for one connection.
#[derive(Debug)]
pub struct ConnectionGuard<'a> {
    state: &'a AppState,
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.state.connections.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kitty_core::actions::handlers::MSG_SOMEONE_ELSE_PETTING;
    use kitty_types::PetEvent;

    use super::*;

    fn make_state() -> AppState {
        AppState::new(&KittyConfig::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn join_snapshot_comes_before_later_changes() {
        let state = make_state();
        state.machine.transition(PetState::BeingPet, "alice");

        let (init, mut rx) = state.join();
        assert_eq!(
            init,
            ServerMessage::StateInit {
                state: PetState::BeingPet,
                events: vec![PetEvent::new(PetState::BeingPet, "alice")],
            }
        );
        assert!(rx.try_recv().is_err());

        state.machine.transition(PetState::Vibing, "SYSTEM");
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::StateChange {
                state: PetState::Vibing,
                username: "SYSTEM".to_owned(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pet_is_broadcast_to_every_subscriber() {
        let state = make_state();
        let (_, mut rx_a) = state.join();
        let (_, mut rx_b) = state.join();

        state.handle_text(r#"{"action":"PET","username":"alice"}"#).unwrap();

        let expected = ServerMessage::StateChange {
            state: PetState::BeingPet,
            username: "alice".to_owned(),
        };
        assert_eq!(rx_a.try_recv().unwrap(), expected);
        assert_eq!(rx_b.try_recv().unwrap(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn rejections_are_narrated_to_everyone() {
        let state = make_state();
        let (_, mut rx) = state.join();

        state.handle_text(r#"{"action":"PET","username":"alice"}"#).unwrap();
        state.handle_text(r#"{"action":"PET","username":"bob"}"#).unwrap();

        let _state_change = rx.try_recv().unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::Message {
                message: MSG_SOMEONE_ELSE_PETTING.to_owned(),
            }
        );
        assert_eq!(state.machine.state(), PetState::BeingPet);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_frames_never_reach_the_core() {
        let state = make_state();

        assert!(matches!(
            state.handle_text("not json"),
            Err(InboundError::Malformed(_))
        ));
        assert!(matches!(
            state.handle_text(r#"{"action":"REVIVE","username":"zed"}"#),
            Err(InboundError::UnknownAction(a)) if a == "REVIVE"
        ));
        assert!(matches!(
            state.handle_text(r#"{"action":"PET","username":"  "}"#),
            Err(InboundError::EmptyUsername)
        ));
        assert_eq!(state.machine.state(), PetState::Vibing);
        assert!(state.machine.last_five_events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pong_is_accepted_silently() {
        let state = make_state();
        let (_, mut rx) = state.join();
        state.handle_text(r#"{"action":"PONG","username":"alice"}"#).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn connection_count_follows_guards() {
        let state = make_state();
        assert_eq!(state.connection_count(), 0);
        let a = state.track_connection();
        let b = state.track_connection();
        assert_eq!(state.connection_count(), 2);
        drop(a);
        assert_eq!(state.connection_count(), 1);
        drop(b);
        assert_eq!(state.connection_count(), 0);
    }

    #[test]
    fn broadcaster_without_subscribers_reports_zero() {
        let (tx, _) = broadcast::channel(4);
        let broadcaster = Broadcaster::new(tx);
        assert_eq!(broadcaster.send(ServerMessage::Ping), 0);
    }
}
