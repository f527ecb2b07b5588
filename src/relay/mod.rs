//! Relay core: role registry, replay buffer and event dispatch

pub mod buffer;
pub mod dispatcher;
pub mod registry;
pub mod state;

pub use buffer::AudioRingBuffer;
pub use dispatcher::Dispatcher;
pub use registry::{ConnectionRegistry, Registration};
pub use state::{RelayState, RelayStats};
