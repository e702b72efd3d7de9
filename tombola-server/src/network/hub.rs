//! Sync Hub
//!
//! Owns the single authoritative `DrawState` and the registry of connected
//! sessions. Mutations are serialized through the state write lock and the
//! resulting event is fanned out while that lock is still held, so every
//! session sees events in the same order the state changed.
//!
//! ```text
//! submit(op) ──► state.write() ──► engine::apply ──► swap state
//!                                                       │
//!                         ┌─────────────────────────────┘
//!                         ▼
//!              try_send to every session (never waits)
//!                         │
//!                         ▼
//!              queue CompletedGame for history ──► release lock
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::engine::{
    self, CheckResult, CompletedGame, ErrorKind, GameError, Operation, Transition,
};
use crate::game::events::DrawEvent;
use crate::game::state::DrawState;
use crate::history::HistoryStore;
use crate::network::protocol::ServerMessage;
use crate::network::session::{ClientSession, SessionId};

/// Delivery failure for a single session. Never reaches the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The session's queue is full; the client is not keeping up.
    #[error("session queue full")]
    Backlogged,

    /// The receiving side is gone.
    #[error("session closed")]
    Closed,
}

impl TransportError {
    /// Always `ErrorKind::Transport`.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Transport
    }
}

impl<T> From<TrySendError<T>> for TransportError {
    fn from(e: TrySendError<T>) -> Self {
        match e {
            TrySendError::Full(_) => TransportError::Backlogged,
            TrySendError::Closed(_) => TransportError::Closed,
        }
    }
}

/// Registry entry for one connected session.
struct Subscriber {
    sender: mpsc::Sender<ServerMessage>,
}

impl Subscriber {
    fn deliver(&self, message: ServerMessage) -> Result<(), TransportError> {
        self.sender.try_send(message).map_err(TransportError::from)
    }
}

/// Process-wide authoritative draw state plus broadcast fan-out.
pub struct SyncHub {
    state: RwLock<DrawState>,
    sessions: RwLock<BTreeMap<SessionId, Subscriber>>,
    history: Arc<dyn HistoryStore>,
    history_tx: mpsc::UnboundedSender<CompletedGame>,
    session_buffer: usize,
}

impl SyncHub {
    /// Create a hub with an empty game.
    ///
    /// Spawns the history writer task, so this must run inside a tokio
    /// runtime. `session_buffer` is the per-session queue depth; a session
    /// that falls further behind than that is dropped.
    pub fn new(history: Arc<dyn HistoryStore>, session_buffer: usize) -> Self {
        let (history_tx, history_rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_history_writer(history.clone(), history_rx));

        Self {
            state: RwLock::new(DrawState::new()),
            sessions: RwLock::new(BTreeMap::new()),
            history,
            history_tx,
            session_buffer: session_buffer.max(1),
        }
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Register a new session. Its first message is always a `StateSync`.
    pub async fn connect(&self) -> ClientSession {
        let (sender, receiver) = mpsc::channel(self.session_buffer);
        let id = Uuid::new_v4();

        // Hold the read lock across snapshot and registration so no
        // mutation can land between them.
        let state = self.state.read().await;
        let snapshot = ServerMessage::from(&DrawEvent::state_sync(&state));
        let subscriber = Subscriber { sender };
        if let Err(e) = subscriber.deliver(snapshot) {
            warn!("Snapshot for new session {} failed: {}", id, e);
        }
        let count = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(id, subscriber);
            sessions.len()
        };
        drop(state);

        info!("Session {} connected ({} active)", id, count);
        ClientSession::new(id, receiver)
    }

    /// Forget a session. Shared state is untouched.
    pub async fn disconnect(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(&id).is_some();
        if removed {
            info!("Session {} disconnected ({} active)", id, sessions.len());
        }
        removed
    }

    /// Re-send a snapshot to one session.
    pub async fn resync(&self, id: SessionId) -> Result<(), TransportError> {
        let state = self.state.read().await;
        let snapshot = ServerMessage::from(&DrawEvent::state_sync(&state));
        let result = match self.sessions.read().await.get(&id) {
            Some(subscriber) => subscriber.deliver(snapshot),
            None => Err(TransportError::Closed),
        };
        drop(state);

        if let Err(e) = result {
            warn!("Resync for session {} failed: {}", id, e);
            self.disconnect(id).await;
        }
        result
    }

    /// Number of registered sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Apply a mutation and broadcast its event to every session.
    ///
    /// Concurrent submissions queue on the write lock and are applied one at
    /// a time; each sees the state left by the previous one. A rejected
    /// operation changes nothing and broadcasts nothing.
    pub async fn submit(&self, operation: Operation) -> Result<DrawEvent, GameError> {
        let state = self.state.write().await;
        let transition = engine::apply(&state, operation, Utc::now()).map_err(|e| {
            debug!("Rejected {:?}: {}", operation, e);
            e
        })?;
        Ok(self.commit(state, transition, operation).await)
    }

    /// Draw a number.
    pub async fn draw(&self, number: i64) -> Result<DrawEvent, GameError> {
        self.submit(Operation::Draw(number)).await
    }

    /// Undo the most recent draw.
    pub async fn undo(&self) -> Result<DrawEvent, GameError> {
        self.submit(Operation::Undo).await
    }

    /// Reset the game. Never fails.
    pub async fn reset(&self) -> DrawEvent {
        let state = self.state.write().await;
        let transition = engine::reset(&state, Utc::now());
        self.commit(state, transition, Operation::Reset).await
    }

    /// Read-only check. Nothing is broadcast.
    pub async fn check(&self, number: i64) -> Result<CheckResult, GameError> {
        engine::check(&*self.state.read().await, number)
    }

    /// Consistent copy of the current state.
    pub async fn snapshot(&self) -> DrawState {
        self.state.read().await.clone()
    }

    /// Finished games, oldest first. Store failures yield an empty list.
    pub async fn history(&self) -> Vec<CompletedGame> {
        match self.history.list().await {
            Ok(games) => games,
            Err(e) => {
                warn!("Failed to list game history: {}", e);
                Vec::new()
            }
        }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Swap in the new state, broadcast, and queue any finished game, all
    /// before the write lock is released.
    async fn commit(
        &self,
        mut state: RwLockWriteGuard<'_, DrawState>,
        transition: Transition,
        operation: Operation,
    ) -> DrawEvent {
        let Transition {
            state: next,
            event,
            completed,
        } = transition;

        *state = next;
        let delivered = self.broadcast(&event).await;
        // Queued under the lock so history keeps reset order.
        if let Some(game) = completed {
            self.record(game);
        }
        drop(state);

        debug!(
            "Applied {:?} -> {} ({} drawn, delivered to {})",
            operation,
            event.name(),
            event.drawn().len(),
            delivered
        );
        event
    }

    /// Deliver to every session. Caller holds the state write lock.
    async fn broadcast(&self, event: &DrawEvent) -> usize {
        let message = ServerMessage::from(event);
        let mut failed = Vec::new();
        let mut delivered = 0;

        {
            let sessions = self.sessions.read().await;
            for (id, subscriber) in sessions.iter() {
                match subscriber.deliver(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        warn!("Dropping session {}: {} during {}", id, e, event.name());
                        failed.push(*id);
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in failed {
                sessions.remove(&id);
            }
        }

        delivered
    }

    fn record(&self, game: CompletedGame) {
        let count = game.numbers_drawn();
        if self.history_tx.send(game).is_err() {
            warn!("History writer stopped; game with {} numbers not saved", count);
        }
    }

    async fn run_history_writer(
        store: Arc<dyn HistoryStore>,
        mut games: mpsc::UnboundedReceiver<CompletedGame>,
    ) {
        while let Some(game) = games.recv().await {
            let count = game.numbers_drawn();
            match store.append(game).await {
                Ok(()) => debug!("Saved completed game with {} numbers", count),
                Err(e) => warn!("Failed to save completed game with {} numbers: {}", count, e),
            }
        }
    }
}
