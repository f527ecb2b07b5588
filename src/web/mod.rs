//! Web layer

pub mod handlers;
pub mod server;
pub mod websocket;

pub use server::{build_router, AppState, WebServer};
