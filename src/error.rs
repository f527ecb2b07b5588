//! Error types for the relay server

use thiserror::Error;

/// Errors that stop the server from starting or running
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while handling a single client event.
///
/// None of these are fatal: the connection that produced the event stays
/// open and the sender receives an `error` event instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("audio_chunk is missing the 'audio' field")]
    MissingAudio,

    #[error("Binary frames are not supported")]
    BinaryFrame,
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
