//! End-to-end tests over real WebSocket connections.
//!
//! Each test binds the server on an ephemeral port and talks to `/ws` with a
//! `tokio-tungstenite` client.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use audio_relay::config::AppConfig;
use audio_relay::web::{AppState, WebServer};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_server(config: AppConfig) -> (SocketAddr, Arc<AppState>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = WebServer::new(&config);
    let state = server.state().clone();
    tokio::spawn(server.serve(listener, std::future::pending()));
    (addr, state)
}

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    socket
}

async fn send_event(socket: &mut Socket, event: Value) {
    socket.send(Message::Text(event.to_string())).await.unwrap();
}

/// Next event from the server, skipping control frames
async fn next_event(socket: &mut Socket) -> Value {
    loop {
        let frame = tokio::time::timeout(WAIT, socket.next())
            .await
            .expect("timed out waiting for an event")
            .expect("socket closed")
            .unwrap();
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Skip events until one matches `wanted`
async fn wait_for(socket: &mut Socket, wanted: Value) {
    loop {
        if next_event(socket).await == wanted {
            return;
        }
    }
}

#[tokio::test]
async fn test_binary_frame_gets_error_reply() {
    let (addr, _state) = start_server(AppConfig::default()).await;
    let mut client = connect(addr).await;

    client.send(Message::Binary(vec![1, 2, 3])).await.unwrap();

    let reply = next_event(&mut client).await;
    assert_eq!(reply["event"], json!("error"));
    assert!(reply["data"]["message"].as_str().unwrap().contains("Binary"));

    // The connection stays usable
    send_event(&mut client, json!({"event": "ping"})).await;
    assert_eq!(next_event(&mut client).await, json!({"event": "pong"}));
}

#[tokio::test]
async fn test_mobile_close_notifies_pc() {
    let (addr, state) = start_server(AppConfig::default()).await;

    let mut desktop = connect(addr).await;
    send_event(&mut desktop, json!({"event": "register_pc"})).await;
    wait_for(
        &mut desktop,
        json!({"event": "status_update", "data": {"mobile_connected": false, "pc_connected": true}}),
    )
    .await;

    let mut phone = connect(addr).await;
    send_event(&mut phone, json!({"event": "register_mobile"})).await;
    wait_for(
        &mut desktop,
        json!({"event": "status_update", "data": {"mobile_connected": true, "pc_connected": true}}),
    )
    .await;

    phone.close(None).await.unwrap();

    assert_eq!(
        next_event(&mut desktop).await,
        json!({"event": "device_disconnected", "data": {"role": "mobile"}})
    );
    assert_eq!(
        next_event(&mut desktop).await,
        json!({"event": "status_update", "data": {"mobile_connected": false, "pc_connected": true}})
    );
    assert!(!state.relay.registry.get_status().mobile_connected);
}

#[tokio::test]
async fn test_audio_relayed_over_socket() {
    let (addr, _state) = start_server(AppConfig::default()).await;

    let mut desktop = connect(addr).await;
    send_event(&mut desktop, json!({"event": "register_pc"})).await;
    wait_for(
        &mut desktop,
        json!({"event": "status_update", "data": {"mobile_connected": false, "pc_connected": true}}),
    )
    .await;

    let mut phone = connect(addr).await;
    send_event(
        &mut phone,
        json!({"event": "audio_chunk", "data": {"audio": "UklGRg==", "timestamp": 7}}),
    )
    .await;

    wait_for(
        &mut desktop,
        json!({"event": "audio_to_pc", "data": {"audio": "UklGRg==", "timestamp": 7}}),
    )
    .await;
}

#[tokio::test]
async fn test_idle_client_is_closed() {
    let mut config = AppConfig::default();
    config.server.idle_timeout_secs = 1;
    let (addr, state) = start_server(config).await;

    let mut client = connect(addr).await;

    let closed = tokio::time::timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "idle client was not closed");
    assert_eq!(state.hub.client_count(), 0);
}
