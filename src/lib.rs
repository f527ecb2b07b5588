//! # Audio Relay
//!
//! Relays a live microphone stream from a phone to a desktop browser through
//! a central server.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐                                        ┌──────────────┐
//! │  Phone       │                                        │  Desktop     │
//! │ /mobile.html │                                        │  /pc.html    │
//! └──────┬───────┘                                        └──────▲───────┘
//!        │ audio_chunk {audio, timestamp}                        │ audio_to_pc
//!        ▼                                                       │
//! ┌──────────────────────────────────────────────────────────────┴───────┐
//! │                        RELAY SERVER (/ws)                             │
//! │  ┌────────────────┐   ┌──────────────────────┐   ┌─────────────────┐  │
//! │  │ Socket task    │──▶│ Dispatcher           │──▶│ Hub             │  │
//! │  │ (per client)   │   │ (relay::dispatcher)  │   │ (transport::hub)│  │
//! │  └────────────────┘   └──────────┬───────────┘   └─────────────────┘  │
//! │                                  │                                    │
//! │                  ┌───────────────┴───────────────┐                    │
//! │                  ▼                               ▼                    │
//! │       ┌─────────────────────┐        ┌──────────────────────┐         │
//! │       │ ConnectionRegistry  │        │ AudioRingBuffer      │         │
//! │       │ mobile / pc holders │        │ last 100 chunks      │         │
//! │       └─────────────────────┘        └──────────────────────┘         │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod transport;
pub mod web;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default HTTP port
    pub const DEFAULT_PORT: u16 = 5000;

    /// Chunks kept for late-joining consumers
    pub const AUDIO_BUFFER_CAPACITY: usize = 100;

    /// Outbound events queued per client
    pub const CLIENT_QUEUE_CAPACITY: usize = 256;
}
