//! Rolling window of recent transitions.

use std::collections::VecDeque;

use kitty_types::{PetEvent, PetState};

/// How many events newly connected clients get to see.
pub const HISTORY_CAPACITY: usize = 5;

/// Insertion-ordered, bounded history. The oldest entry is dropped once
/// [`HISTORY_CAPACITY`] is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventHistory {
    events: VecDeque<PetEvent>,
}

impl EventHistory {
    /// An empty history.
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Append an event, evicting from the front as needed.
    pub fn record(&mut self, state: PetState, actor: &str) {
        while self.events.len() >= HISTORY_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(PetEvent::new(state, actor));
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &PetEvent> {
        self.events.iter()
    }

    /// Owned copy, oldest-first.
    pub fn to_vec(&self) -> Vec<PetEvent> {
        self.events.iter().cloned().collect()
    }
}
