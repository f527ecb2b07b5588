//! WebSocket event channel
//!
//! One task per connection reads frames and feeds the dispatcher; a second
//! task drains the connection's outbound queue into the socket. Teardown runs
//! from a drop guard, so a connection task that panics still releases its role.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::ProtocolError;
use crate::protocol::{ConnectionId, ServerMessage};
use crate::web::server::AppState;

/// Handles WebSocket upgrade requests to `/ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let remote = connect_info.map(|ConnectInfo(addr)| addr);
    ws.on_upgrade(move |socket| handle_socket(socket, state, remote))
}

/// Detaches a connection and releases its role when dropped
struct ConnectionGuard {
    state: Arc<AppState>,
    id: ConnectionId,
}

impl ConnectionGuard {
    fn attach(
        state: Arc<AppState>,
        id: ConnectionId,
        remote: Option<SocketAddr>,
    ) -> (Self, mpsc::Receiver<ServerMessage>) {
        let outbound = state.hub.attach(id, remote);
        (Self { state, id }, outbound)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("Connection task for {} panicked", self.id);
        }
        self.state.hub.detach(self.id);
        self.state.dispatcher.disconnect(self.id);
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, remote: Option<SocketAddr>) {
    let id = ConnectionId::new();
    let (guard, mut outbound) = ConnectionGuard::attach(state.clone(), id, remote);
    match remote {
        Some(addr) => tracing::info!("New client {} from {}", id, addr),
        None => tracing::info!("New client {}", id),
    }

    let (mut sink, mut stream) = socket.split();

    // Ends once the hub drops this client's sender
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            if sink.send(Message::Text(msg.to_json())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        let next = match state.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::info!("Client {} idle for {:?}, closing", id, limit);
                    break;
                }
            },
            None => stream.next().await,
        };

        let Some(frame) = next else { break };
        match frame {
            Ok(Message::Text(text)) => {
                // Rejections are already answered and logged
                let _ = state.dispatcher.handle_text(id, &text);
            }
            Ok(Message::Binary(_)) => state.dispatcher.reject(id, &ProtocolError::BinaryFrame),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Client {} socket error: {}", id, e);
                break;
            }
        }
    }

    drop(guard);

    if writer.await.is_err() {
        tracing::warn!("Writer task for client {} panicked", id);
    }
}
