//! End-to-end tests for the real-time channel over a real socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use tombola::network::server::RealtimeConfig;
use tombola::network::{ClientMessage, RealtimeServer, ServerMessage, SyncHub};
use tombola::MemoryHistoryStore;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (Arc<SyncHub>, Arc<RealtimeServer>, SocketAddr) {
    start_server_with(RealtimeConfig::default()).await
}

async fn start_server_with(config: RealtimeConfig) -> (Arc<SyncHub>, Arc<RealtimeServer>, SocketAddr) {
    let hub = Arc::new(SyncHub::new(Arc::new(MemoryHistoryStore::new()), 64));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(RealtimeServer::new(config, hub.clone()));

    let running = server.clone();
    tokio::spawn(async move { running.serve(listener).await });

    (hub, server, addr)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    client
}

async fn next_message(client: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return ServerMessage::from_json(&text).unwrap();
        }
    }
}

async fn send(client: &mut Client, msg: &ClientMessage) {
    client
        .send(Message::Text(msg.to_json().unwrap()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_snapshot_then_live_updates() {
    let (hub, _server, addr) = start_server().await;
    for n in [3, 41, 9] {
        hub.draw(n).await.unwrap();
    }

    let mut client = connect(addr).await;
    match next_message(&mut client).await {
        ServerMessage::StateSync(view) => {
            assert_eq!(view.drawn_numbers, vec![3, 41, 9]);
            assert_eq!(view.total_drawn, 3);
            assert_eq!(view.remaining, 87);
        }
        other => panic!("Expected state_sync, got {:?}", other),
    }

    hub.draw(50).await.unwrap();
    match next_message(&mut client).await {
        ServerMessage::NumberDrawn(update) => {
            assert_eq!(update.number, 50);
            assert_eq!(update.drawn_numbers, vec![3, 41, 9, 50]);
        }
        other => panic!("Expected number_drawn, got {:?}", other),
    }

    hub.undo().await.unwrap();
    assert_eq!(
        next_message(&mut client).await.drawn_numbers(),
        Some(&[3u8, 41, 9][..])
    );

    hub.reset().await;
    assert!(matches!(
        next_message(&mut client).await,
        ServerMessage::GameReset(view) if view.drawn_numbers.is_empty()
    ));
}

#[tokio::test]
async fn test_ping_and_sync_request() {
    let (hub, _server, addr) = start_server().await;
    let mut client = connect(addr).await;
    assert!(matches!(
        next_message(&mut client).await,
        ServerMessage::StateSync(_)
    ));

    send(&mut client, &ClientMessage::Ping { timestamp: 1234 }).await;
    match next_message(&mut client).await {
        ServerMessage::Pong { timestamp, .. } => assert_eq!(timestamp, 1234),
        other => panic!("Expected pong, got {:?}", other),
    }

    hub.draw(77).await.unwrap();
    assert!(matches!(
        next_message(&mut client).await,
        ServerMessage::NumberDrawn(_)
    ));

    send(&mut client, &ClientMessage::SyncRequest).await;
    match next_message(&mut client).await {
        ServerMessage::StateSync(view) => assert_eq!(view.drawn_numbers, vec![77]),
        other => panic!("Expected state_sync, got {:?}", other),
    }

    client
        .send(Message::Text("{\"type\":\"draw\",\"number\":4}".to_string()))
        .await
        .unwrap();
    assert!(matches!(
        next_message(&mut client).await,
        ServerMessage::Error(_)
    ));
    assert_eq!(hub.snapshot().await.drawn(), &[77]);
}

#[tokio::test]
async fn test_two_clients_converge() {
    let (hub, _server, addr) = start_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    next_message(&mut a).await;
    next_message(&mut b).await;

    let numbers = [12u8, 88, 1, 45, 90];
    for n in numbers {
        hub.draw(i64::from(n)).await.unwrap();
    }

    for client in [&mut a, &mut b] {
        let mut last = Vec::new();
        for _ in 0..numbers.len() {
            if let Some(drawn) = next_message(client).await.drawn_numbers() {
                last = drawn.to_vec();
            }
        }
        assert_eq!(last, numbers.to_vec());
    }
}

#[tokio::test]
async fn test_disconnect_leaves_state_and_other_clients() {
    let (hub, _server, addr) = start_server().await;
    let mut stays = connect(addr).await;
    let mut leaves = connect(addr).await;
    next_message(&mut stays).await;
    next_message(&mut leaves).await;

    hub.draw(5).await.unwrap();
    leaves.close(None).await.unwrap();
    drop(leaves);

    assert!(matches!(
        next_message(&mut stays).await,
        ServerMessage::NumberDrawn(_)
    ));

    for _ in 0..100 {
        if hub.session_count().await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(hub.session_count().await, 1);
    assert_eq!(hub.snapshot().await.drawn(), &[5]);
}

#[tokio::test]
async fn test_shutdown_notifies_clients() {
    let (_hub, server, addr) = start_server().await;
    let mut client = connect(addr).await;
    next_message(&mut client).await;

    server.shutdown();
    match next_message(&mut client).await {
        ServerMessage::Shutdown { reason } => assert!(!reason.is_empty()),
        other => panic!("Expected shutdown, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_limit_rejects_extra_clients() {
    let (hub, server, addr) = start_server_with(RealtimeConfig {
        max_connections: 1,
        ..RealtimeConfig::default()
    })
    .await;

    let mut first = connect(addr).await;
    assert!(matches!(
        next_message(&mut first).await,
        ServerMessage::StateSync(_)
    ));

    let second = tokio::time::timeout(
        Duration::from_secs(2),
        connect_async(format!("ws://{}", addr)),
    )
    .await
    .expect("rejected connect should fail promptly");
    assert!(second.is_err());

    assert_eq!(hub.session_count().await, 1);
    assert_eq!(server.connection_count(), 1);

    // The admitted client still gets live updates.
    hub.draw(64).await.unwrap();
    assert_eq!(
        next_message(&mut first).await.drawn_numbers(),
        Some(&[64u8][..])
    );
}
