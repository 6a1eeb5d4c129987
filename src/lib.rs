//! TCP Chat Relay Library
//!
//! Clients connect over TCP and send text; every chunk a client sends is
//! relayed to every other connected client.
//!
//! # Architecture
//! - `Registry` is an actor owning the set of live connections, keyed by
//!   `ClientId`; sessions and the listener talk to it over `mpsc` channels
//! - Each accepted stream gets a `Session` task for reading and a writer
//!   task behind an unbounded send queue, so writes to one client are
//!   serialized and a slow client never blocks the others
//! - `broadcast` queues a message for every registered connection except
//!   the sender
//!
//! # Example
//! ```ignore
//! use chat_relay::{Config, RelayListener};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = RelayListener::bind(Config::default()).await.unwrap();
//!     listener.run(std::future::pending()).await;
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod error;
pub mod listener;
pub mod message;
pub mod registry;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{broadcast, Delivery};
pub use config::Config;
pub use connection::{Connection, WriteHandle};
pub use error::{AppError, ConfigError, SendError};
pub use listener::RelayListener;
pub use message::Message;
pub use registry::{Registry, RegistryCommand};
pub use session::{Session, SessionEnd};
pub use types::ClientId;
