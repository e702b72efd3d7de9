//! Real-time WebSocket Server
//!
//! Push channel from the hub to connected viewers. Each connection gets a
//! `ClientSession`; its first frame is the `state_sync` snapshot, followed by
//! one frame per applied operation. Clients may only ping or ask for a fresh
//! snapshot here; mutations go through the HTTP API.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::network::hub::SyncHub;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerError as WireError, ServerMessage};

/// Real-time server settings.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
        }
    }
}

/// Real-time server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// The real-time server.
pub struct RealtimeServer {
    config: RealtimeConfig,
    hub: Arc<SyncHub>,
    connections: Arc<AtomicUsize>,
    shutdown_tx: watch::Sender<bool>,
}

impl RealtimeServer {
    /// Create a server publishing `hub`'s events.
    pub fn new(config: RealtimeConfig, hub: Arc<SyncHub>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            hub,
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Bind the configured address. Pass the listener to `serve`.
    #[instrument(skip(self))]
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        Ok(TcpListener::bind(&self.config.bind_addr).await?)
    }

    /// Serve on an already-bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!("Real-time server listening on {}", listener.local_addr()?);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.load(Ordering::SeqCst) >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = wait_for_shutdown(&mut shutdown_rx) => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let hub = self.hub.clone();
        let connections = self.connections.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        connections.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    connections.fetch_sub(1, Ordering::SeqCst);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (direct_tx, mut direct_rx) = mpsc::channel::<ServerMessage>(16);

            let mut session = hub.connect().await;
            let session_id = session.id();
            info!("Client {} joined as session {}", addr, session_id);

            // Forward hub events and direct replies to the socket.
            let mut sender_task = tokio::spawn(async move {
                loop {
                    // Direct replies first so a queued shutdown notice is
                    // flushed before the closed session ends the loop.
                    let msg = tokio::select! {
                        biased;
                        Some(msg) = direct_rx.recv() => msg,
                        msg = session.recv() => match msg {
                            Some(m) => m,
                            None => {
                                debug!("Session {} dropped by hub", session_id);
                                break;
                            }
                        },
                    };

                    let closing = matches!(msg, ServerMessage::Shutdown { .. });
                    if !Self::send_frame(&mut ws_sender, &msg).await {
                        break;
                    }
                    if closing {
                        break;
                    }
                }
                debug!("Session {} closed after {:?}", session_id, session.age());
                let _ = ws_sender.close().await;
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(ClientMessage::SyncRequest) => {
                                        if hub.resync(session_id).await.is_err() {
                                            break;
                                        }
                                    }
                                    Ok(ClientMessage::Ping { timestamp }) => {
                                        let _ = direct_tx.send(ServerMessage::Pong {
                                            timestamp,
                                            server_time: now_millis(),
                                        }).await;
                                    }
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = direct_tx.send(ServerMessage::Error(WireError {
                                            code: ErrorCode::InvalidInput,
                                            message: "Invalid message format".to_string(),
                                        })).await;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            // Ping/pong frames are answered by tungstenite.
                            Some(Ok(_)) => {}
                        }
                    }
                    _ = &mut sender_task => {
                        break;
                    }
                    _ = wait_for_shutdown(&mut shutdown_rx) => {
                        let _ = direct_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            hub.disconnect(session_id).await;
            drop(direct_tx);
            if !sender_task.is_finished() {
                // Give the shutdown notice a moment to flush.
                let _ = tokio::time::timeout(std::time::Duration::from_millis(250), &mut sender_task).await;
                sender_task.abort();
            }
            connections.fetch_sub(1, Ordering::SeqCst);

            info!("Client {} cleaned up", addr);
        });
    }

    async fn send_frame<S>(ws_sender: &mut S, msg: &ServerMessage) -> bool
    where
        S: Sink<Message> + Unpin,
    {
        let text = match msg.to_json() {
            Ok(t) => t,
            Err(e) => {
                error!("Failed to serialize message: {}", e);
                return true;
            }
        };
        ws_sender.send(Message::Text(text)).await.is_ok()
    }

    /// Shutdown the server and notify connected clients.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Resolve once shutdown is signalled or the server is gone.
async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    // The `Ref` from `wait_for` is not `Send`; it must not outlive this fn.
    let _ = shutdown_rx.wait_for(|&stop| stop).await;
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistoryStore;

    #[test]
    fn test_realtime_config_default() {
        let config = RealtimeConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let hub = Arc::new(SyncHub::new(Arc::new(MemoryHistoryStore::new()), 8));
        let server = RealtimeServer::new(RealtimeConfig::default(), hub);
        assert_eq!(server.connection_count(), 0);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_serve_future_is_send() {
        let hub = Arc::new(SyncHub::new(Arc::new(MemoryHistoryStore::new()), 8));
        let server = RealtimeServer::new(RealtimeConfig::default(), hub);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (_tx, mut rx) = watch::channel(false);

        assert_send(&server.serve(listener));
        assert_send(&wait_for_shutdown(&mut rx));
    }

    #[tokio::test]
    async fn test_bind_conflict_is_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = RealtimeConfig {
            bind_addr: taken.local_addr().unwrap(),
            ..RealtimeConfig::default()
        };
        let hub = Arc::new(SyncHub::new(Arc::new(MemoryHistoryStore::new()), 8));
        let server = RealtimeServer::new(config, hub);

        assert!(matches!(server.bind().await, Err(ServerError::BindFailed(_))));
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let hub = Arc::new(SyncHub::new(Arc::new(MemoryHistoryStore::new()), 8));
        let server = Arc::new(RealtimeServer::new(RealtimeConfig::default(), hub));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let running = server.clone();
        server.shutdown();
        let handle = tokio::spawn(async move { running.serve(listener).await });

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
