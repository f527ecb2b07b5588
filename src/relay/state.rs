//! Server state shared by every connection handler

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use super::buffer::AudioRingBuffer;
use super::registry::ConnectionRegistry;
use crate::config::RelaySettings;
use crate::protocol::DeviceStatus;

/// Owned relay state: role registry, replay buffer and counters
pub struct RelayState {
    pub registry: ConnectionRegistry,
    pub buffer: AudioRingBuffer,
    chunks_received: AtomicU64,
    chunks_forwarded: AtomicU64,
    started_at: DateTime<Utc>,
}

/// Point-in-time statistics
#[derive(Debug, Clone, Serialize)]
pub struct RelayStats {
    #[serde(flatten)]
    pub status: DeviceStatus,
    pub buffered_chunks: usize,
    pub buffer_capacity: usize,
    pub chunks_received: u64,
    pub chunks_forwarded: u64,
    pub chunks_evicted: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
}

impl RelayState {
    pub fn new(settings: &RelaySettings) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            buffer: AudioRingBuffer::new(settings.buffer_capacity),
            chunks_received: AtomicU64::new(0),
            chunks_forwarded: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub(crate) fn record_received(&self) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forwarded(&self) {
        self.chunks_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> RelayStats {
        let uptime = Utc::now().signed_duration_since(self.started_at);
        RelayStats {
            status: self.registry.get_status(),
            buffered_chunks: self.buffer.len(),
            buffer_capacity: self.buffer.capacity(),
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            chunks_forwarded: self.chunks_forwarded.load(Ordering::Relaxed),
            chunks_evicted: self.buffer.evicted_count(),
            started_at: self.started_at,
            uptime_seconds: uptime.num_seconds().max(0) as u64,
        }
    }
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new(&RelaySettings::default())
    }
}
