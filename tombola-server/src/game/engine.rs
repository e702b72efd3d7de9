//! Draw Engine
//!
//! Pure state transitions over `DrawState`. No locking and no clock reads:
//! the caller serializes calls and supplies the reset timestamp, so the same
//! inputs always give the same outputs.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::game::events::DrawEvent;
use crate::game::state::{in_range, DrawState, MAX_NUMBER, MIN_NUMBER};

// =============================================================================
// ERRORS
// =============================================================================

/// Error classes surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input outside the board.
    Validation,
    /// Valid input that contradicts the current state.
    Conflict,
    /// Delivery to a single session failed.
    Transport,
}

/// Rejection of a single operation. State is never modified when returned.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    /// Number outside `MIN_NUMBER..=MAX_NUMBER`.
    #[error("Invalid number. Must be between {} and {}", MIN_NUMBER, MAX_NUMBER)]
    OutOfRange {
        /// Rejected value.
        number: i64,
    },

    /// Number is already in the drawn sequence.
    #[error("Number {number} has already been drawn")]
    AlreadyDrawn {
        /// Rejected value.
        number: u8,
    },

    /// Undo on an empty game.
    #[error("No numbers to undo")]
    NothingToUndo,
}

impl GameError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::OutOfRange { .. } => ErrorKind::Validation,
            GameError::AlreadyDrawn { .. } | GameError::NothingToUndo => ErrorKind::Conflict,
        }
    }
}

/// Validate a raw value as a board number.
pub fn validate_number(value: i64) -> Result<u8, GameError> {
    if in_range(value) {
        Ok(value as u8)
    } else {
        Err(GameError::OutOfRange { number: value })
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// A finished game, handed to the history store on reset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedGame {
    /// When the game was closed.
    #[serde(rename = "date", deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Drawn numbers in draw order.
    pub numbers: Vec<u8>,
}

impl CompletedGame {
    /// Count of numbers drawn in the game.
    pub fn numbers_drawn(&self) -> usize {
        self.numbers.len()
    }
}

/// Accepts RFC 3339 and offset-less ISO 8601 (`2024-05-01T20:15:00.123456`),
/// reading the latter as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(serde::de::Error::custom)
}

/// Answer to a read-only check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckResult {
    /// The number asked about.
    pub number: u8,
    /// Whether it has been drawn.
    pub drawn: bool,
}

impl CheckResult {
    /// Human-readable answer.
    pub fn message(&self) -> String {
        if self.drawn {
            format!("Number {} has already been drawn", self.number)
        } else {
            format!("Number {} has not been drawn", self.number)
        }
    }
}

/// Output of a successful mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// State after the operation.
    pub state: DrawState,
    /// Event to broadcast.
    pub event: DrawEvent,
    /// Snapshot to persist, produced only by a reset of a non-empty game.
    pub completed: Option<CompletedGame>,
}

/// A mutating request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Mark a number as drawn.
    Draw(i64),
    /// Remove the most recent draw.
    Undo,
    /// Clear the game.
    Reset,
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Append `number` to the drawn sequence.
pub fn draw(state: &DrawState, number: i64) -> Result<Transition, GameError> {
    let number = validate_number(number)?;
    if state.contains(number) {
        return Err(GameError::AlreadyDrawn { number });
    }

    let mut next = state.clone();
    next.push(number);
    let event = DrawEvent::number_drawn(number, &next);

    Ok(Transition {
        state: next,
        event,
        completed: None,
    })
}

/// Remove the last-drawn number, whatever its value.
pub fn undo(state: &DrawState) -> Result<Transition, GameError> {
    let mut next = state.clone();
    let number = next.pop().ok_or(GameError::NothingToUndo)?;
    let event = DrawEvent::number_undone(number, &next);

    Ok(Transition {
        state: next,
        event,
        completed: None,
    })
}

/// Clear the game. Never fails.
///
/// A `CompletedGame` is produced only if something had been drawn, so a
/// second reset in a row leaves no history entry.
pub fn reset(state: &DrawState, now: DateTime<Utc>) -> Transition {
    let mut prior = state.clone();
    let numbers = prior.take();
    let completed = if numbers.is_empty() {
        None
    } else {
        Some(CompletedGame {
            timestamp: now,
            numbers,
        })
    };

    Transition {
        state: DrawState::new(),
        event: DrawEvent::game_reset(),
        completed,
    }
}

/// Report whether `number` has been drawn. Produces no event.
pub fn check(state: &DrawState, number: i64) -> Result<CheckResult, GameError> {
    let number = validate_number(number)?;
    Ok(CheckResult {
        number,
        drawn: state.contains(number),
    })
}

/// Dispatch an operation.
pub fn apply(
    state: &DrawState,
    operation: Operation,
    now: DateTime<Utc>,
) -> Result<Transition, GameError> {
    match operation {
        Operation::Draw(number) => draw(state, number),
        Operation::Undo => undo(state),
        Operation::Reset => Ok(reset(state, now)),
    }
}
