//! Client session
//!
//! Reads chunks from one connection until EOF or error, broadcasting each
//! chunk to every other client. On exit the connection is removed from the
//! registry and closed, whichever way the read loop ended.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, info, warn};

use crate::broadcast::broadcast;
use crate::connection::{Connection, WriteHandle};
use crate::error::AppError;
use crate::message::Message;
use crate::registry::Registry;

/// How the read loop ended
#[derive(Debug)]
pub enum SessionEnd {
    /// Peer closed the stream
    Clean,
    /// Transport error while reading
    Error(io::Error),
}

/// Per-connection read-and-dispatch task
pub struct Session<R> {
    conn: Connection,
    reader: R,
    writer: WriteHandle,
    registry: Registry,
    read_buffer_size: usize,
}

impl<R> Session<R>
where
    R: AsyncRead + Unpin,
{
    /// Wrap both halves of a stream
    ///
    /// Returns the connection handle to register and the session to run.
    pub fn new<W>(
        peer: impl Into<std::sync::Arc<str>>,
        reader: R,
        writer: W,
        registry: Registry,
        read_buffer_size: usize,
    ) -> (Connection, Self)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (conn, writer) = Connection::open(peer, writer);
        let session = Self {
            conn: conn.clone(),
            reader,
            writer,
            registry,
            read_buffer_size,
        };
        (conn, session)
    }

    /// Run until the peer disconnects, then clean up
    ///
    /// The connection must already be registered.
    pub async fn run(mut self) -> Result<(), AppError> {
        let client_id = self.conn.id();
        info!("Client {} connected from {}", client_id, self.conn.peer());

        let end = self.read_loop().await;

        self.registry.remove(client_id).await;
        self.writer.close().await;

        match end {
            SessionEnd::Clean => {
                info!("Client {} disconnected", client_id);
                Ok(())
            }
            SessionEnd::Error(e) => {
                warn!("Client {} error: {}", client_id, e);
                info!("Client {} disconnected", client_id);
                Err(AppError::Io(e))
            }
        }
    }

    async fn read_loop(&mut self) -> SessionEnd {
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            let n = match self.reader.read(&mut buf).await {
                Ok(0) => return SessionEnd::Clean,
                Ok(n) => n,
                Err(e) => return SessionEnd::Error(e),
            };

            let msg = Message::from(&buf[..n]);
            info!("Received from {}: {}", self.conn.id(), msg.preview());

            let delivery = broadcast(&self.registry, &self.conn, &msg).await;
            debug!(
                "Message from {} delivered to {}, skipped {}",
                self.conn.id(),
                delivery.delivered,
                delivery.skipped
            );
        }
    }
}
