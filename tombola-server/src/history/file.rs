//! JSON file history backend.
//!
//! The whole history lives in one document, `{"game_history": [...]}`.
//! Writes go to a sibling temp file that is renamed over the live file, so a
//! crash mid-write never leaves a truncated file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::game::engine::CompletedGame;
use crate::history::{HistoryError, HistoryStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    game_history: Vec<CompletedGame>,
}

/// History persisted to a JSON file.
#[derive(Debug)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl JsonFileHistoryStore {
    /// Use `path`, which need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HistoryFile, HistoryError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HistoryFile::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HistoryFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, file: &HistoryFile) -> Result<(), HistoryError> {
        let json = serde_json::to_vec_pretty(file)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistoryStore {
    async fn append(&self, game: CompletedGame) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        file.game_history.push(game);
        self.store(&file).await?;
        debug!(
            "Appended game to {} ({} games stored)",
            self.path.display(),
            file.game_history.len()
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CompletedGame>, HistoryError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.load().await?.game_history)
    }
}
