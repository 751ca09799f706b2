//! The pet's state machine.
//!
//! [`StateMachine`] is a cloneable handle to one shared session: the
//! current [`PetState`], the rolling [`EventHistory`], the last time the
//! kitty slept, and at most one pending autonomous transition.
//!
//! # Timers
//!
//! Entering a state with an [`AutoTransition`] spawns a Tokio task that
//! sleeps for the entry's delay and then applies the transition on behalf
//! of [`SYSTEM_ACTOR`]. The session holds a single `Option` slot for that
//! task. Every transition empties the slot (aborting the task) before
//! refilling it, and every armed task carries a generation number that it
//! re-checks under the session lock before acting. A timer that lost a race
//! with a user action therefore finds a different generation (or an empty
//! slot) and does nothing.
//!
//! # Serialization
//!
//! All reads and writes go through [`SessionGuard`], which holds the
//! session mutex. Handlers that check state and then transition do both
//! through one guard, so a timer cannot fire in between. The observer is
//! invoked while the guard is held, which keeps notifications in the same
//! order as the transitions themselves.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use kitty_types::{PetEvent, PetSnapshot, PetState, SYSTEM_ACTOR};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::history::EventHistory;
use crate::table::{AutoTransition, TransitionTable};

/// Receives every non-silent transition.
///
/// Called synchronously while the session lock is held. Implementations
/// must not call back into the [`StateMachine`] (that would deadlock) and
/// should not block. [`Narrator`](crate::actions::Narrator) and
/// [`ActionHandler`](crate::actions::ActionHandler) run outside the lock;
/// see their docs for the rules they follow.
pub trait TransitionObserver: Send + Sync {
    /// A transition into `state` caused by `actor` was applied.
    fn on_transition(&self, state: PetState, actor: &str);
}

impl<F> TransitionObserver for F
where
    F: Fn(PetState, &str) + Send + Sync,
{
    fn on_transition(&self, state: PetState, actor: &str) {
        self(state, actor);
    }
}

/// An observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl TransitionObserver for NoOpObserver {
    fn on_transition(&self, _state: PetState, _actor: &str) {}
}

/// Errors that can occur when building a [`StateMachine`].
#[derive(Debug, thiserror::Error)]
pub enum StateMachineError {
    /// Autonomous timers are Tokio tasks; there was no runtime to put them on.
    #[error("state machine must be created inside a Tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// The autonomous transition currently scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    /// State the timer will move to.
    pub target: PetState,
    /// When it fires.
    pub deadline: Instant,
}

impl PendingTransition {
    /// Time left before the timer fires (zero if overdue).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// When the kitty last fell asleep.
///
/// The monotonic instant drives cooldown checks; the wall-clock time is
/// what clients are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepStamp {
    /// Monotonic time of falling asleep.
    pub instant: Instant,
    /// Wall-clock time of falling asleep.
    pub at: DateTime<Utc>,
}

impl SleepStamp {
    fn now() -> Self {
        Self {
            instant: Instant::now(),
            at: Utc::now(),
        }
    }

    /// Whether the kitty fell asleep less than `window` ago.
    pub fn is_within(&self, window: Duration) -> bool {
        self.instant.elapsed() < window
    }
}

struct ArmedTimer {
    generation: u64,
    pending: PendingTransition,
    abort: AbortHandle,
}

struct Session {
    state: PetState,
    last_time_slept: Option<SleepStamp>,
    history: EventHistory,
    timer: Option<ArmedTimer>,
    next_generation: u64,
}

struct Shared {
    session: Mutex<Session>,
    table: TransitionTable,
    observer: Box<dyn TransitionObserver>,
    runtime: Handle,
}

impl Shared {
    fn lock(self: &Arc<Self>) -> SessionGuard<'_> {
        SessionGuard {
            shared: self,
            session: self
                .session
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Timer callback. Applies the pending transition only if `generation`
    /// still owns the timer slot.
    fn fire(self: &Arc<Self>, generation: u64) {
        let mut guard = self.lock();
        let target = match guard.session.timer.as_ref() {
            Some(timer) if timer.generation == generation => timer.pending.target,
            _ => {
                debug!(generation, "Stale autonomous timer ignored");
                return;
            }
        };
        // This task is the timer; clear the slot without aborting ourselves.
        guard.session.timer = None;
        guard.transition(target, SYSTEM_ACTOR);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = session.timer.take() {
            timer.abort.abort();
        }
    }
}

/// Handle to the shared pet session.
///
/// Cloning is cheap and every clone refers to the same pet. When the last
/// handle is dropped the pending timer is cancelled.
#[derive(Clone)]
pub struct StateMachine {
    shared: Arc<Shared>,
}

impl StateMachine {
    /// Create a machine in [`PetState::Vibing`] and arm its first timer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        table: TransitionTable,
        observer: impl TransitionObserver + 'static,
    ) -> Result<Self, StateMachineError> {
        let initial = PetState::Vibing;
        let runtime = Handle::try_current()?;
        let machine = Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    state: initial,
                    last_time_slept: None,
                    history: EventHistory::new(),
                    timer: None,
                    next_generation: 0,
                }),
                table,
                observer: Box::new(observer),
                runtime,
            }),
        };
        machine.lock().arm();
        info!(state = %initial, "State machine started");
        Ok(machine)
    }

    /// Lock the session for a check-then-act step.
    pub fn lock(&self) -> SessionGuard<'_> {
        self.shared.lock()
    }

    /// Apply `target` unconditionally. See [`SessionGuard::transition`].
    pub fn transition(&self, target: PetState, actor: &str) -> bool {
        self.lock().transition(target, actor)
    }

    /// Current state.
    pub fn state(&self) -> PetState {
        self.lock().state()
    }

    /// The rolling history, oldest first.
    pub fn last_five_events(&self) -> Vec<PetEvent> {
        self.lock().last_five_events()
    }

    /// When the kitty last fell asleep.
    pub fn last_time_slept(&self) -> Option<SleepStamp> {
        self.lock().last_time_slept()
    }

    /// The autonomous transition currently scheduled, if any.
    pub fn pending_transition(&self) -> Option<PendingTransition> {
        self.lock().pending_transition()
    }

    /// Consistent read model of the session.
    pub fn snapshot(&self) -> PetSnapshot {
        self.lock().snapshot()
    }

    /// Cancel the pending timer. Idempotent.
    ///
    /// Once this returns no autonomous transition that was already
    /// scheduled will be applied. A later explicit [`transition`] re-arms
    /// as usual.
    ///
    /// [`transition`]: Self::transition
    pub fn dispose(&self) {
        let mut guard = self.lock();
        if guard.cancel_timer() {
            info!(state = %guard.state(), "State machine disposed");
        }
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.lock();
        f.debug_struct("StateMachine")
            .field("state", &guard.session.state)
            .field("history", &guard.session.history)
            .field("pending", &guard.pending_transition())
            .finish_non_exhaustive()
    }
}

/// Exclusive access to the session for the duration of one step.
pub struct SessionGuard<'a> {
    shared: &'a Arc<Shared>,
    session: MutexGuard<'a, Session>,
}

impl SessionGuard<'_> {
    /// Current state.
    pub fn state(&self) -> PetState {
        self.session.state
    }

    /// When the kitty last fell asleep.
    pub fn last_time_slept(&self) -> Option<SleepStamp> {
        self.session.last_time_slept
    }

    /// The rolling history as an owned list, oldest first.
    pub fn last_five_events(&self) -> Vec<PetEvent> {
        self.session.history.to_vec()
    }

    /// The autonomous transition currently scheduled, if any.
    pub fn pending_transition(&self) -> Option<PendingTransition> {
        self.session.timer.as_ref().map(|t| t.pending)
    }

    /// Consistent read model of the session.
    pub fn snapshot(&self) -> PetSnapshot {
        PetSnapshot {
            state: self.session.state,
            events: self.session.history.to_vec(),
            last_time_slept: self.session.last_time_slept.map(|s| s.at),
        }
    }

    /// Apply `target` as the new state.
    ///
    /// No legality check happens here; handlers decide whether to call it.
    /// In order: cancel the pending timer, set the state, stamp the sleep
    /// time when entering [`PetState::Sleeping`], record the event, notify
    /// the observer unless the target's entry is silent, re-arm from the
    /// target's entry. Always returns `true`.
    pub fn transition(&mut self, target: PetState, actor: &str) -> bool {
        self.cancel_timer();

        let previous = std::mem::replace(&mut self.session.state, target);

        if target == PetState::Sleeping {
            self.session.last_time_slept = Some(SleepStamp::now());
        }

        self.session.history.record(target, actor);

        let silent = self.shared.table.is_silent(target);
        info!(from = %previous, to = %target, actor, silent, "Transition applied");

        if !silent {
            self.shared.observer.on_transition(target, actor);
        }

        self.arm();
        true
    }

    /// Empty the timer slot. Returns whether a timer was pending.
    fn cancel_timer(&mut self) -> bool {
        match self.session.timer.take() {
            Some(timer) => {
                timer.abort.abort();
                debug!(
                    generation = timer.generation,
                    target = %timer.pending.target,
                    "Autonomous timer cancelled"
                );
                true
            }
            None => false,
        }
    }

    /// Fill the timer slot from the current state's table entry.
    fn arm(&mut self) {
        let state = self.session.state;
        let Some(AutoTransition { target, delay, .. }) = self.shared.table.get(state).copied()
        else {
            debug!(%state, "No autonomous transition from state");
            return;
        };

        let Some(deadline) = Instant::now().checked_add(delay) else {
            warn!(%state, ?delay, "Autonomous delay overflows the clock, not arming");
            return;
        };

        let generation = self.session.next_generation;
        self.session.next_generation = generation.wrapping_add(1);

        let weak: Weak<Shared> = Arc::downgrade(self.shared);
        let task = self.shared.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(shared) = weak.upgrade() {
                shared.fire(generation);
            }
        });

        debug!(from = %state, to = %target, ?delay, generation, "Autonomous timer armed");

        self.session.timer = Some(ArmedTimer {
            generation,
            pending: PendingTransition { target, deadline },
            abort: task.abort_handle(),
        });
    }
}
