//! Game Logic Module
//!
//! Pure draw-state rules. Nothing here touches I/O or the clock; the reset
//! timestamp is passed in by the caller.
//!
//! ## Module Structure
//!
//! - `state`: The drawn sequence and its derived views
//! - `engine`: Draw, undo, reset and check transitions
//! - `events`: Events emitted for each applied transition

pub mod engine;
pub mod events;
pub mod state;

// Re-export key types
pub use engine::{CheckResult, CompletedGame, ErrorKind, GameError, Operation, Transition};
pub use events::DrawEvent;
pub use state::{DrawState, GamePhase, MAX_NUMBER, MIN_NUMBER, TOTAL_NUMBERS};
