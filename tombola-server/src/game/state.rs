//! Draw State Definitions
//!
//! The authoritative record of which numbers have been drawn in the
//! current game. Only `game::engine` mutates it.

use serde::Serialize;

// =============================================================================
// NUMBER RANGE
// =============================================================================

/// Lowest number on the board.
pub const MIN_NUMBER: u8 = 1;

/// Highest number on the board.
pub const MAX_NUMBER: u8 = 90;

/// Count of numbers on the board.
pub const TOTAL_NUMBERS: usize = MAX_NUMBER as usize;

/// Check whether a raw value is a board number.
#[inline]
pub fn in_range(value: i64) -> bool {
    (MIN_NUMBER as i64..=MAX_NUMBER as i64).contains(&value)
}

// =============================================================================
// GAME PHASE
// =============================================================================

/// Coarse lifecycle of a game, derived from the drawn count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Nothing drawn yet.
    Idle,
    /// Between 1 and 89 numbers drawn.
    InProgress,
    /// Every number drawn.
    Complete,
}

// =============================================================================
// DRAW STATE
// =============================================================================

/// Ordered record of drawn numbers, oldest first.
///
/// Invariants: every value lies in `MIN_NUMBER..=MAX_NUMBER` and appears at
/// most once. The set of available numbers is always derived, never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DrawState {
    drawn: Vec<u8>,
}

impl DrawState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self {
            drawn: Vec::with_capacity(TOTAL_NUMBERS),
        }
    }

    /// Drawn numbers in draw order.
    pub fn drawn(&self) -> &[u8] {
        &self.drawn
    }

    /// Number of drawn numbers.
    pub fn len(&self) -> usize {
        self.drawn.len()
    }

    /// True when nothing has been drawn.
    pub fn is_empty(&self) -> bool {
        self.drawn.is_empty()
    }

    /// Numbers still left to draw.
    pub fn remaining(&self) -> usize {
        TOTAL_NUMBERS - self.drawn.len()
    }

    /// Whether `number` has been drawn.
    pub fn contains(&self, number: u8) -> bool {
        self.drawn.contains(&number)
    }

    /// Most recently drawn number.
    pub fn last(&self) -> Option<u8> {
        self.drawn.last().copied()
    }

    /// Undrawn numbers in ascending order.
    pub fn available(&self) -> Vec<u8> {
        let mut taken = [false; TOTAL_NUMBERS + 1];
        for &n in &self.drawn {
            taken[n as usize] = true;
        }
        (MIN_NUMBER..=MAX_NUMBER)
            .filter(|&n| !taken[n as usize])
            .collect()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> GamePhase {
        match self.drawn.len() {
            0 => GamePhase::Idle,
            TOTAL_NUMBERS => GamePhase::Complete,
            _ => GamePhase::InProgress,
        }
    }

    /// Append a number. Caller has already validated range and uniqueness.
    pub(crate) fn push(&mut self, number: u8) {
        debug_assert!(in_range(number as i64));
        debug_assert!(!self.contains(number));
        self.drawn.push(number);
    }

    /// Remove the most recently drawn number.
    pub(crate) fn pop(&mut self) -> Option<u8> {
        self.drawn.pop()
    }

    /// Take the drawn sequence, leaving the state empty.
    pub(crate) fn take(&mut self) -> Vec<u8> {
        std::mem::replace(&mut self.drawn, Vec::with_capacity(TOTAL_NUMBERS))
    }
}
