//! Network Layer
//!
//! Two surfaces over one `SyncHub`: the HTTP API takes operator requests,
//! the WebSocket server pushes every applied event to connected viewers.

pub mod api;
pub mod hub;
pub mod protocol;
pub mod server;
pub mod session;

pub use api::{router, ApiError};
pub use hub::{SyncHub, TransportError};
pub use protocol::{ClientMessage, ServerMessage, StateView};
pub use server::{RealtimeConfig, RealtimeServer, ServerError};
pub use session::{ClientSession, SessionId};
