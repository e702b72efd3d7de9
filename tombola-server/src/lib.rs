//! # Tombola Draw Server
//!
//! Authoritative number-draw state for a live tombola game, kept in sync
//! across every connected viewer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TOMBOLA SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Draw rules (pure)                         │
//! │  ├── state.rs    - Drawn sequence, phase, derived views      │
//! │  ├── engine.rs   - draw / undo / reset / check               │
//! │  └── events.rs   - Events emitted per transition             │
//! │                                                              │
//! │  history/        - Completed-game storage                    │
//! │  ├── memory.rs   - In-process store                          │
//! │  └── file.rs     - JSON file store                           │
//! │                                                              │
//! │  network/        - Transport                                 │
//! │  ├── hub.rs      - Authoritative state + fan-out             │
//! │  ├── session.rs  - Per-client receive side                   │
//! │  ├── protocol.rs - Real-time message types                   │
//! │  ├── server.rs   - WebSocket push server                     │
//! │  └── api.rs      - HTTP request surface                      │
//! │                                                              │
//! │  config.rs       - Environment-driven settings               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering Guarantee
//!
//! Every mutation is applied under a single write lock and broadcast before
//! the lock is released. All sessions therefore observe the same events in
//! the same order, and each event carries the full drawn sequence.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod game;
pub mod history;
pub mod network;

// Re-export commonly used types
pub use config::{ConfigError, ServerConfig};
pub use game::{DrawEvent, DrawState, GameError, Operation};
pub use history::{HistoryStore, JsonFileHistoryStore, MemoryHistoryStore};
pub use network::{RealtimeServer, SyncHub};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
