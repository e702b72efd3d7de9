//! Game History
//!
//! Narrow seam to the store of finished games. The hub only appends on
//! reset and lists on request; the backend is chosen at startup.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::game::engine::CompletedGame;

pub use file::JsonFileHistoryStore;
pub use memory::MemoryHistoryStore;

/// History persistence errors.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Reading or writing the backing file failed.
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file holds malformed JSON.
    #[error("history format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Storage backend for completed games.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a finished game.
    async fn append(&self, game: CompletedGame) -> Result<(), HistoryError>;

    /// All finished games, oldest first.
    async fn list(&self) -> Result<Vec<CompletedGame>, HistoryError>;
}
