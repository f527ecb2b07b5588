//! Event delivery to connected clients
//!
//! The relay core only needs two capabilities from the transport: send an
//! event to one client, and send it to every client. Role-targeted delivery
//! is built on top of these by resolving the role holder in the registry.

pub mod hub;

pub use hub::{ClientInfo, Hub};

use crate::protocol::{ConnectionId, ServerMessage};

/// Outbound delivery capability
///
/// Implementations must only enqueue and never block: the relay delivers
/// status events while holding the registry lock.
pub trait Transport: Send + Sync {
    /// Queue `msg` for one client; returns false if it was not queued
    fn send_to(&self, id: ConnectionId, msg: ServerMessage) -> bool;

    /// Queue `msg` for every attached client; returns how many accepted it
    fn broadcast(&self, msg: ServerMessage) -> usize;
}
