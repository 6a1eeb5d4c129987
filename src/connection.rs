//! Connection handle and its write path
//!
//! Every connection gets an unbounded send queue drained by a single writer
//! task. All writes to a destination go through that task, so messages
//! from different senders never interleave on the wire, and a client that
//! reads slowly only grows its own queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::SendError;
use crate::message::Message;
use crate::types::ClientId;

/// Handle to one accepted connection
///
/// Cheap to clone. Equality is identity: two handles are equal when they
/// refer to the same accepted connection.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Identity used for exclusion during broadcast
    id: ClientId,
    /// Remote address, for logs
    peer: Arc<str>,
    /// Relay -> client queue
    sender: mpsc::UnboundedSender<Message>,
    /// Cleared when the connection is closed or its writer fails
    open: Arc<AtomicBool>,
}

impl Connection {
    /// Create a connection around the write half of a stream
    ///
    /// Spawns the writer task. The returned `WriteHandle` belongs to the
    /// owning session and is used to close the connection.
    pub fn open<W>(peer: impl Into<Arc<str>>, writer: W) -> (Self, WriteHandle)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let id = ClientId::new();
        let (sender, receiver) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(write_loop(id, writer, receiver, open.clone()));

        let conn = Self {
            id,
            peer: peer.into(),
            sender,
            open: open.clone(),
        };
        let handle = WriteHandle { id, open, task };

        (conn, handle)
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Whether the connection still accepts messages
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.sender.is_closed()
    }

    /// Queue a message for this connection without waiting
    ///
    /// Only fails once the connection is closed or its writer has stopped.
    pub fn send(&self, msg: Message) -> Result<(), SendError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(SendError::ChannelClosed);
        }

        self.sender.send(msg).map_err(|_| SendError::ChannelClosed)
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}

/// Owner-side handle to a connection's writer task
///
/// `close` consumes the handle, so a connection is closed at most once.
#[derive(Debug)]
pub struct WriteHandle {
    id: ClientId,
    open: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl WriteHandle {
    /// Close the connection
    ///
    /// Marks it closed, stops the writer and drops the write half. Anything
    /// still queued is discarded.
    pub async fn close(self) {
        self.open.store(false, Ordering::Release);
        self.task.abort();

        match self.task.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => error!("Write task for {} panicked: {}", self.id, e),
        }

        debug!("Connection {} closed", self.id);
    }
}

/// Drain the send queue into the stream until it closes or a write fails
async fn write_loop<W>(
    id: ClientId,
    mut writer: W,
    mut receiver: mpsc::UnboundedReceiver<Message>,
    open: Arc<AtomicBool>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = receiver.recv().await {
        if let Err(e) = writer.write_all(msg.as_bytes()).await {
            warn!("Write to {} failed: {}", id, e);
            break;
        }
    }

    open.store(false, Ordering::Release);
    receiver.close();
    let _ = writer.shutdown().await;

    debug!("Write task ended for {}", id);
}
