//! Startup configuration
//!
//! The only operator-facing knob is the listen port, taken from the first
//! positional argument. Everything else uses the defaults below.

use crate::error::ConfigError;

/// Default listen host (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 5000;

/// Bytes requested per read
pub const READ_BUFFER_SIZE: usize = 1024;

/// Channel buffer size for registry commands
pub const REGISTRY_BUFFER_SIZE: usize = 256;

/// Relay configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub read_buffer_size: usize,
    pub registry_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_buffer_size: READ_BUFFER_SIZE,
            registry_buffer_size: REGISTRY_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Build a config from command line arguments (program name excluded)
    ///
    /// Only the first argument is looked at. Anything that does not parse as
    /// a `u16` is rejected.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();

        if let Some(arg) = args.into_iter().next() {
            let arg = arg.as_ref();
            config.port = arg
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(arg.to_string()))?;
        }

        Ok(config)
    }

    /// `host:port` string to bind to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One-line usage message printed on a bad port argument
pub fn usage() -> String {
    format!("Usage: chat_relay [port] (default {DEFAULT_PORT})")
}
