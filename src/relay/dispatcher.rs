//! Event dispatch for client connections
//!
//! Audio is forwarded role-targeted: an `audio_chunk` goes only to the
//! connection currently holding the `pc` role, and is dropped from delivery
//! (but still buffered) when no pc is registered.
//!
//! Status events are enqueued while the registry lock is held, so every
//! client sees role changes in the order they were applied. Enqueueing never
//! blocks; socket writes happen on each client's own writer task.

use std::sync::Arc;

use super::state::RelayState;
use crate::error::ProtocolError;
use crate::protocol::{
    AudioChunk, AudioChunkPayload, ClientMessage, ConnectionId, Role, ServerMessage,
};
use crate::transport::Transport;

/// Routes client events against the shared relay state
pub struct Dispatcher<T: Transport> {
    state: Arc<RelayState>,
    transport: Arc<T>,
}

impl<T: Transport> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(state: Arc<RelayState>, transport: Arc<T>) -> Self {
        Self { state, transport }
    }

    pub fn state(&self) -> &Arc<RelayState> {
        &self.state
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Decode and handle one text frame
    ///
    /// A rejected frame is answered with an `error` event to the sender only.
    pub fn handle_text(&self, from: ConnectionId, text: &str) -> Result<(), ProtocolError> {
        let result = ClientMessage::parse(text).and_then(|msg| self.handle(from, msg));
        if let Err(ref e) = result {
            self.reject(from, e);
        }
        result
    }

    /// Answer a rejected event
    pub fn reject(&self, from: ConnectionId, err: &ProtocolError) {
        tracing::warn!("Rejected event from {}: {}", from, err);
        self.transport.send_to(from, ServerMessage::error(err));
    }

    /// Handle one decoded event
    pub fn handle(&self, from: ConnectionId, msg: ClientMessage) -> Result<(), ProtocolError> {
        tracing::trace!("{} -> {}", from, msg.event_name());

        match msg {
            ClientMessage::RegisterMobile => self.register(from, Role::Mobile),
            ClientMessage::RegisterPc => self.register(from, Role::Pc),
            ClientMessage::AudioChunk(payload) => return self.relay_audio(from, payload),
            ClientMessage::GetBuffer => self.send_buffer(from),
            ClientMessage::ClearBuffer => self.clear_buffer(from),
            ClientMessage::Ping => {
                self.transport.send_to(from, ServerMessage::Pong);
            }
        }
        Ok(())
    }

    fn register(&self, from: ConnectionId, role: Role) {
        let registration = self.state.registry.set_connected_and(role, from, |reg| {
            self.transport.broadcast(ServerMessage::StatusUpdate(reg.status));
        });

        if let Some(released) = registration.released {
            tracing::info!("{} released role {}", from, released);
        }
        if let Some(previous) = registration.displaced {
            tracing::warn!("{} took role {} over from {}", from, role, previous);
        }
        tracing::info!("{} registered as {}", from, role);
    }

    fn relay_audio(
        &self,
        from: ConnectionId,
        payload: AudioChunkPayload,
    ) -> Result<(), ProtocolError> {
        let audio = payload.audio.ok_or(ProtocolError::MissingAudio)?;
        let chunk = AudioChunk::new(audio, payload.timestamp.unwrap_or(0));
        self.state.record_received();

        if self.state.registry.role_of(from) != Some(Role::Mobile) {
            tracing::debug!("Audio chunk from {} which is not the registered mobile", from);
        }

        match self.state.registry.holder(Role::Pc) {
            Some(pc) => {
                if self.transport.send_to(pc, ServerMessage::AudioToPc(chunk.clone())) {
                    self.state.record_forwarded();
                }
            }
            None => tracing::trace!("No pc registered, buffering chunk only"),
        }

        if self.state.buffer.push(chunk).is_some() {
            tracing::trace!("Replay buffer full, evicted oldest chunk");
        }
        Ok(())
    }

    fn send_buffer(&self, from: ConnectionId) {
        let buffer = self.state.buffer.snapshot();
        tracing::debug!("Sending {} buffered chunks to {}", buffer.len(), from);
        self.transport.send_to(from, ServerMessage::Buffer { buffer });
    }

    fn clear_buffer(&self, from: ConnectionId) {
        let dropped = self.state.buffer.clear();
        tracing::info!("{} cleared the replay buffer ({} chunks)", from, dropped);
        self.transport.broadcast(ServerMessage::BufferCleared);
    }

    /// Tear down a connection's role and notify the remaining clients
    ///
    /// The transport must already have dropped the connection.
    pub fn disconnect(&self, from: ConnectionId) -> Option<Role> {
        let role = self.state.registry.release_and(from, |role, status| {
            self.transport
                .broadcast(ServerMessage::DeviceDisconnected { role });
            if role.is_some() {
                self.transport.broadcast(ServerMessage::StatusUpdate(status));
            }
        });

        match role {
            Some(role) => tracing::info!("{} ({}) disconnected", from, role),
            None => tracing::info!("{} disconnected", from),
        }
        role
    }
}
