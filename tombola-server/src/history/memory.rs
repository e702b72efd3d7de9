//! In-memory history backend. Used when no history file is configured and
//! in tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::game::engine::CompletedGame;
use crate::history::{HistoryError, HistoryStore};

/// In-process history, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    games: Mutex<Vec<CompletedGame>>,
}

impl MemoryHistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored games.
    pub fn len(&self) -> usize {
        self.games.lock().len()
    }

    /// True before the first completed game.
    pub fn is_empty(&self) -> bool {
        self.games.lock().is_empty()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, game: CompletedGame) -> Result<(), HistoryError> {
        self.games.lock().push(game);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CompletedGame>, HistoryError> {
        Ok(self.games.lock().clone())
    }
}
