//! Error types for the relay
//!
//! Defines listener-level errors, configuration errors and per-destination
//! send errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// `Bind` is listener-fatal. `Io` covers per-connection transport failures,
/// which only ever end the session that hit them.
#[derive(Debug, Error)]
pub enum AppError {
    /// Listening socket could not be bound (fatal)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Startup configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Port argument is not a valid port number
    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

/// Message send errors
///
/// Returned when a message is queued for a destination that is gone.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The destination was closed or its writer has stopped
    #[error("Channel closed")]
    ChannelClosed,
}
