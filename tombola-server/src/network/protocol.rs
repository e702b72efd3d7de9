//! Protocol Messages
//!
//! Wire format for the real-time channel. All messages are JSON text
//! frames tagged by `type`. Every state-bearing message carries the full
//! drawn sequence, so a client that misses one still converges on the next.

use serde::{Deserialize, Serialize};

use crate::game::events::DrawEvent;
use crate::game::state::{DrawState, TOTAL_NUMBERS};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
///
/// The real-time channel is push-only for game state; mutations go through
/// the HTTP request surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for a fresh snapshot.
    SyncRequest,

    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Snapshot, sent first on every connection.
    StateSync(StateView),

    /// A number was drawn.
    NumberDrawn(NumberUpdate),

    /// The last number was undone.
    NumberUndone(NumberUpdate),

    /// The game was reset.
    GameReset(StateView),

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// Full drawn state as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateView {
    /// Drawn numbers in draw order.
    pub drawn_numbers: Vec<u8>,
    /// Count of drawn numbers.
    pub total_drawn: usize,
    /// Numbers left to draw.
    pub remaining: usize,
}

impl StateView {
    /// Build from a drawn sequence.
    pub fn from_drawn(drawn: &[u8]) -> Self {
        Self {
            drawn_numbers: drawn.to_vec(),
            total_drawn: drawn.len(),
            remaining: TOTAL_NUMBERS - drawn.len(),
        }
    }
}

impl From<&DrawState> for StateView {
    fn from(state: &DrawState) -> Self {
        Self::from_drawn(state.drawn())
    }
}

/// Full state plus the number an operation acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberUpdate {
    /// Drawn or undone number.
    pub number: u8,
    /// Drawn numbers in draw order.
    pub drawn_numbers: Vec<u8>,
    /// Count of drawn numbers.
    pub total_drawn: usize,
    /// Numbers left to draw.
    pub remaining: usize,
}

impl NumberUpdate {
    fn new(number: u8, drawn: &[u8]) -> Self {
        let view = StateView::from_drawn(drawn);
        Self {
            number,
            drawn_numbers: view.drawn_numbers,
            total_drawn: view.total_drawn,
            remaining: view.remaining,
        }
    }
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unparseable client frame.
    InvalidInput,
}

impl From<&DrawEvent> for ServerMessage {
    fn from(event: &DrawEvent) -> Self {
        match event {
            DrawEvent::NumberDrawn { number, drawn } => {
                ServerMessage::NumberDrawn(NumberUpdate::new(*number, drawn))
            }
            DrawEvent::NumberUndone { number, drawn } => {
                ServerMessage::NumberUndone(NumberUpdate::new(*number, drawn))
            }
            DrawEvent::GameReset { drawn } => ServerMessage::GameReset(StateView::from_drawn(drawn)),
            DrawEvent::StateSync { drawn } => ServerMessage::StateSync(StateView::from_drawn(drawn)),
        }
    }
}

impl ServerMessage {
    /// Drawn sequence carried by a state-bearing message.
    pub fn drawn_numbers(&self) -> Option<&[u8]> {
        match self {
            ServerMessage::StateSync(view) | ServerMessage::GameReset(view) => {
                Some(view.drawn_numbers.as_slice())
            }
            ServerMessage::NumberDrawn(update) | ServerMessage::NumberUndone(update) => {
                Some(update.drawn_numbers.as_slice())
            }
            _ => None,
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_drawn_wire_shape() {
        let event = DrawEvent::NumberDrawn {
            number: 23,
            drawn: vec![7, 23],
        };
        let json = ServerMessage::from(&event).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "number_drawn");
        assert_eq!(value["number"], 23);
        assert_eq!(value["drawn_numbers"], serde_json::json!([7, 23]));
        assert_eq!(value["total_drawn"], 2);
        assert_eq!(value["remaining"], 88);
    }

    #[test]
    fn test_state_sync_wire_shape() {
        let event = DrawEvent::StateSync {
            drawn: vec![3, 41, 9],
        };
        let msg = ServerMessage::from(&event);
        assert_eq!(msg.drawn_numbers(), Some(&[3u8, 41, 9][..]));

        let parsed = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        match parsed {
            ServerMessage::StateSync(view) => {
                assert_eq!(view.drawn_numbers, vec![3, 41, 9]);
                assert_eq!(view.total_drawn, 3);
                assert_eq!(view.remaining, 87);
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_reset_and_undo_tags() {
        let reset = ServerMessage::from(&DrawEvent::game_reset()).to_json().unwrap();
        assert!(reset.contains("\"type\":\"game_reset\""));
        assert!(reset.contains("\"remaining\":90"));

        let undone = ServerMessage::from(&DrawEvent::NumberUndone {
            number: 12,
            drawn: vec![5],
        });
        assert!(undone.to_json().unwrap().contains("\"type\":\"number_undone\""));
    }

    #[test]
    fn test_client_messages_parse() {
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"sync_request"}"#).unwrap(),
            ClientMessage::SyncRequest
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"ping","timestamp":42}"#).unwrap(),
            ClientMessage::Ping { timestamp: 42 }
        );
        assert!(ClientMessage::from_json(r#"{"type":"draw","number":5}"#).is_err());
    }

    #[test]
    fn test_error_codes() {
        let msg = ServerMessage::Error(ServerError {
            code: ErrorCode::InvalidInput,
            message: "Invalid message format".to_string(),
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("invalid_input"));
        assert_eq!(msg.drawn_numbers(), None);
    }
}
