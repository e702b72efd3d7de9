//! Draw Events
//!
//! Produced by the engine for each state transition and fanned out by the
//! hub. Every event carries the full resulting sequence, never a delta.

use serde::Serialize;

use crate::game::state::{DrawState, TOTAL_NUMBERS};

/// A change to (or snapshot of) the draw state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DrawEvent {
    /// A number was appended.
    NumberDrawn {
        number: u8,
        drawn: Vec<u8>,
    },

    /// The most recent number was removed.
    NumberUndone {
        number: u8,
        drawn: Vec<u8>,
    },

    /// The game was cleared.
    GameReset {
        drawn: Vec<u8>,
    },

    /// Full snapshot for a newly connected or resyncing session.
    StateSync {
        drawn: Vec<u8>,
    },
}

impl DrawEvent {
    /// Create number drawn event.
    pub fn number_drawn(number: u8, state: &DrawState) -> Self {
        Self::NumberDrawn {
            number,
            drawn: state.drawn().to_vec(),
        }
    }

    /// Create number undone event.
    pub fn number_undone(number: u8, state: &DrawState) -> Self {
        Self::NumberUndone {
            number,
            drawn: state.drawn().to_vec(),
        }
    }

    /// Create game reset event.
    pub fn game_reset() -> Self {
        Self::GameReset { drawn: Vec::new() }
    }

    /// Create a snapshot event.
    pub fn state_sync(state: &DrawState) -> Self {
        Self::StateSync {
            drawn: state.drawn().to_vec(),
        }
    }

    /// Resulting drawn sequence.
    pub fn drawn(&self) -> &[u8] {
        match self {
            Self::NumberDrawn { drawn, .. }
            | Self::NumberUndone { drawn, .. }
            | Self::GameReset { drawn }
            | Self::StateSync { drawn } => drawn.as_slice(),
        }
    }

    /// Number the operation acted on, if any.
    pub fn number(&self) -> Option<u8> {
        match self {
            Self::NumberDrawn { number, .. } | Self::NumberUndone { number, .. } => Some(*number),
            Self::GameReset { .. } | Self::StateSync { .. } => None,
        }
    }

    /// Numbers left after this event.
    pub fn remaining(&self) -> usize {
        TOTAL_NUMBERS - self.drawn().len()
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NumberDrawn { .. } => "number_drawn",
            Self::NumberUndone { .. } => "number_undone",
            Self::GameReset { .. } => "game_reset",
            Self::StateSync { .. } => "state_sync",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_carries_full_sequence() {
        let mut state = DrawState::new();
        state.push(7);
        state.push(23);

        let event = DrawEvent::number_drawn(23, &state);
        assert_eq!(event.drawn(), &[7, 23]);
        assert_eq!(event.number(), Some(23));
        assert_eq!(event.remaining(), 88);
    }

    #[test]
    fn test_reset_event_is_empty() {
        let event = DrawEvent::game_reset();
        assert!(event.drawn().is_empty());
        assert_eq!(event.number(), None);
        assert_eq!(event.remaining(), 90);
        assert_eq!(event.name(), "game_reset");
    }
}
