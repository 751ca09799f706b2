//! The autonomous transition table.
//!
//! Each state may carry one [`AutoTransition`]: after `delay` with no other
//! transition, the machine moves to `target` on behalf of
//! [`SYSTEM_ACTOR`](kitty_types::SYSTEM_ACTOR).

use std::collections::BTreeMap;
use std::time::Duration;

use kitty_types::PetState;

/// Time a neglected kitty spends vibing before it starts dying.
pub const VIBING_TIMEOUT: Duration = Duration::from_secs(4 * 60 * 60);
/// Time a dying kitty has left.
pub const DYING_TIMEOUT: Duration = Duration::from_secs(4 * 60 * 60);
/// How long a petting session lasts.
pub const PETTING_DURATION: Duration = Duration::from_secs(6);
/// How long the kitty sleeps.
pub const SLEEP_DURATION: Duration = Duration::from_secs(8 * 60 * 60);

/// A timer-driven transition out of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoTransition {
    /// State entered when the timer fires.
    pub target: PetState,
    /// Time spent in the source state before firing.
    pub delay: Duration,
    /// When set, *entering the source state* does not notify the observer.
    pub silent: bool,
}

impl AutoTransition {
    /// A non-silent transition to `target` after `delay`.
    pub const fn new(target: PetState, delay: Duration) -> Self {
        Self {
            target,
            delay,
            silent: false,
        }
    }

    /// Mark this entry silent.
    #[must_use]
    pub const fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// Static per-state policy. Immutable once the machine is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    entries: BTreeMap<PetState, AutoTransition>,
}

impl TransitionTable {
    /// A table with no autonomous transitions at all.
    pub const fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Set (or replace) the entry for `from`.
    #[must_use]
    pub fn with_entry(mut self, from: PetState, auto: AutoTransition) -> Self {
        self.entries.insert(from, auto);
        self
    }

    /// Remove the entry for `from`, making it terminal.
    #[must_use]
    pub fn without_entry(mut self, from: PetState) -> Self {
        self.entries.remove(&from);
        self
    }

    /// The autonomous transition out of `state`, if any.
    pub fn get(&self, state: PetState) -> Option<&AutoTransition> {
        self.entries.get(&state)
    }

    /// Whether entering `state` should skip the observer.
    pub fn is_silent(&self, state: PetState) -> bool {
        self.get(state).is_some_and(|auto| auto.silent)
    }

    /// Whether `state` has no way out on its own.
    pub fn is_terminal(&self, state: PetState) -> bool {
        self.get(state).is_none()
    }
}

impl Default for TransitionTable {
    /// The game's fixed decay/recovery policy.
    ///
    /// | From | To | Delay |
    /// |---|---|---|
    /// | `VIBING` | `DYING` | 4 h |
    /// | `BEING_PET` | `VIBING` | 6 s |
    /// | `DYING` | `DEAD` | 4 h |
    /// | `DEAD` | -- | -- |
    /// | `SLEEPING` | `VIBING` | 8 h |
    fn default() -> Self {
        Self::empty()
            .with_entry(
                PetState::Vibing,
                AutoTransition::new(PetState::Dying, VIBING_TIMEOUT),
            )
            .with_entry(
                PetState::BeingPet,
                AutoTransition::new(PetState::Vibing, PETTING_DURATION),
            )
            .with_entry(
                PetState::Dying,
                AutoTransition::new(PetState::Dead, DYING_TIMEOUT),
            )
            .with_entry(
                PetState::Sleeping,
                AutoTransition::new(PetState::Vibing, SLEEP_DURATION),
            )
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    const ONE_SECOND: Duration = Duration::from_secs(1);
    const ONE_HOUR: Duration = Duration::from_secs(60 * 60);

    #[test]
    fn default_table_matches_policy() {
        let table = TransitionTable::default();

        let vibing = table.get(PetState::Vibing).copied();
        assert_eq!(
            vibing,
            Some(AutoTransition::new(PetState::Dying, ONE_HOUR * 4))
        );

        let petting = table.get(PetState::BeingPet).copied();
        assert_eq!(
            petting,
            Some(AutoTransition::new(PetState::Vibing, ONE_SECOND * 6))
        );

        let dying = table.get(PetState::Dying).copied();
        assert_eq!(dying, Some(AutoTransition::new(PetState::Dead, ONE_HOUR * 4)));

        let sleeping = table.get(PetState::Sleeping).copied();
        assert_eq!(
            sleeping,
            Some(AutoTransition::new(PetState::Vibing, ONE_HOUR * 8))
        );
    }

    #[test]
    fn dead_is_the_only_terminal_state() {
        let table = TransitionTable::default();
        let terminal: Vec<PetState> = PetState::ALL
            .into_iter()
            .filter(|s| table.is_terminal(*s))
            .collect();
        assert_eq!(terminal, vec![PetState::Dead]);
    }

    #[test]
    fn nothing_is_silent_by_default() {
        let table = TransitionTable::default();
        assert!(PetState::ALL.into_iter().all(|s| !table.is_silent(s)));
    }

    #[test]
    fn silent_entries_are_reported() {
        let table = TransitionTable::default().with_entry(
            PetState::Dying,
            AutoTransition::new(PetState::Dead, ONE_SECOND).silent(),
        );
        assert!(table.is_silent(PetState::Dying));
        assert!(!table.is_silent(PetState::Dead));
    }
}
