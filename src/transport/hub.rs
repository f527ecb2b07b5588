//! Connection table of per-client outbound queues
//!
//! Each WebSocket task owns the receiving half of a bounded channel; the hub
//! holds the sending halves. Delivery never waits: if a client's queue is
//! full the event is dropped for that client only.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::Transport;
use crate::protocol::{ConnectionId, ServerMessage};

struct ClientHandle {
    tx: mpsc::Sender<ServerMessage>,
    remote: Option<SocketAddr>,
    connected_at: DateTime<Utc>,
}

/// Snapshot of one attached client
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClientInfo {
    pub id: ConnectionId,
    pub remote: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
}

/// Table of attached clients
pub struct Hub {
    clients: DashMap<ConnectionId, ClientHandle>,
    queue_capacity: usize,
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl Hub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            clients: DashMap::new(),
            queue_capacity,
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register a new connection and hand back its outbound queue
    pub fn attach(
        &self,
        id: ConnectionId,
        remote: Option<SocketAddr>,
    ) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.clients.insert(
            id,
            ClientHandle {
                tx,
                remote,
                connected_at: Utc::now(),
            },
        );
        rx
    }

    /// Remove a connection; returns false if it was not attached
    pub fn detach(&self, id: ConnectionId) -> bool {
        self.clients.remove(&id).is_some()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn clients(&self) -> Vec<ClientInfo> {
        self.clients
            .iter()
            .map(|entry| ClientInfo {
                id: *entry.key(),
                remote: entry.remote,
                connected_at: entry.connected_at,
            })
            .collect()
    }

    /// Events queued successfully
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Events dropped because a client queue was full
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn deliver(&self, id: ConnectionId, handle: &ClientHandle, msg: ServerMessage) -> bool {
        match handle.tx.try_send(msg) {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(msg)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Client {} queue full, dropping {}", id, msg.event_name());
                false
            }
            // The socket task is gone; its own teardown detaches it
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

impl Transport for Hub {
    fn send_to(&self, id: ConnectionId, msg: ServerMessage) -> bool {
        match self.clients.get(&id) {
            Some(handle) => self.deliver(id, &handle, msg),
            None => false,
        }
    }

    fn broadcast(&self, msg: ServerMessage) -> usize {
        let mut delivered = 0;
        for entry in self.clients.iter() {
            if self.deliver(*entry.key(), entry.value(), msg.clone()) {
                delivered += 1;
            }
        }
        delivered
    }
}
