//! Client Sessions
//!
//! One `ClientSession` per real-time connection. It owns the receiving end
//! of the hub's per-session queue and keeps a local copy of the drawn
//! sequence, updated from each state-bearing message. The copy is a cache
//! for logging and tests; it is never written back to the hub.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use uuid::Uuid;

use crate::network::protocol::ServerMessage;

/// Unique session identifier. Not stable across reconnects.
pub type SessionId = Uuid;

/// Receiving side of one connection.
#[derive(Debug)]
pub struct ClientSession {
    id: SessionId,
    receiver: mpsc::Receiver<ServerMessage>,
    view: Vec<u8>,
    synced: bool,
    connected_at: Instant,
}

impl ClientSession {
    pub(crate) fn new(id: SessionId, receiver: mpsc::Receiver<ServerMessage>) -> Self {
        Self {
            id,
            receiver,
            view: Vec::new(),
            synced: false,
            connected_at: Instant::now(),
        }
    }

    /// Session identifier, used to disconnect.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Last drawn sequence this session received.
    pub fn view(&self) -> &[u8] {
        &self.view
    }

    /// Whether a snapshot has been received.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Time since the session was created.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the hub has dropped this session, either through
    /// `disconnect` or because its queue overflowed.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        let message = self.receiver.recv().await?;
        self.observe(&message);
        Some(message)
    }

    /// Take a queued message without waiting.
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        match self.receiver.try_recv() {
            Ok(message) => {
                self.observe(&message);
                Some(message)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drain everything queued, returning the messages in order.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    fn observe(&mut self, message: &ServerMessage) {
        if let Some(drawn) = message.drawn_numbers() {
            self.view.clear();
            self.view.extend_from_slice(drawn);
        }
        if matches!(message, ServerMessage::StateSync(_)) {
            self.synced = true;
        }
    }
}
