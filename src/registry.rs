//! Registry actor implementation
//!
//! The set of live connections, keyed by `ClientId`. Owned by a single actor
//! task and mutated only through `RegistryCommand`s, so adds, removes and
//! snapshots from many sessions never race each other.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::types::ClientId;

/// Commands sent from sessions and the listener to the registry actor
#[derive(Debug)]
pub enum RegistryCommand {
    /// Connection accepted
    Add { conn: Connection },
    /// Connection's session ended
    Remove { client_id: ClientId },
    /// Point-in-time copy of all members
    Snapshot {
        respond_to: oneshot::Sender<Vec<Connection>>,
    },
    /// Current member count
    Len { respond_to: oneshot::Sender<usize> },
}

/// The registry actor
///
/// Runs until every `Registry` handle has been dropped.
pub struct RegistryActor {
    /// All live connections: ClientId -> Connection
    connections: HashMap<ClientId, Connection>,
    /// Command receiver channel
    receiver: mpsc::Receiver<RegistryCommand>,
}

impl RegistryActor {
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>) -> Self {
        Self {
            connections: HashMap::new(),
            receiver,
        }
    }

    /// Run the registry event loop
    pub async fn run(mut self) {
        debug!("Registry started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        debug!("Registry shutting down");
    }

    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Add { conn } => {
                info!("Client {} registered ({})", conn.id(), conn.peer());
                self.connections.insert(conn.id(), conn);
                debug!("Total clients: {}", self.connections.len());
            }
            RegistryCommand::Remove { client_id } => {
                if self.connections.remove(&client_id).is_some() {
                    info!("Client {} unregistered", client_id);
                }
                debug!("Total clients: {}", self.connections.len());
            }
            RegistryCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.connections.values().cloned().collect());
            }
            RegistryCommand::Len { respond_to } => {
                let _ = respond_to.send(self.connections.len());
            }
        }
    }
}

/// Handle to the registry actor
///
/// Cloned into the listener and every session. None of the operations can
/// fail while a handle exists, because the handle keeps the actor alive.
#[derive(Debug, Clone)]
pub struct Registry {
    sender: mpsc::Sender<RegistryCommand>,
}

impl Registry {
    /// Spawn the registry actor and return a handle to it
    pub fn spawn(buffer_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        tokio::spawn(RegistryActor::new(receiver).run());
        Self { sender }
    }

    /// Insert a connection
    pub async fn add(&self, conn: Connection) {
        self.send(RegistryCommand::Add { conn }).await;
    }

    /// Remove exactly the connection with this id; no-op for non-members
    pub async fn remove(&self, client_id: ClientId) {
        self.send(RegistryCommand::Remove { client_id }).await;
    }

    /// Copy of the current members, in no particular order
    pub async fn snapshot(&self) -> Vec<Connection> {
        let (respond_to, response) = oneshot::channel();
        self.send(RegistryCommand::Snapshot { respond_to }).await;
        response.await.unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        let (respond_to, response) = oneshot::channel();
        self.send(RegistryCommand::Len { respond_to }).await;
        response.await.unwrap_or_default()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn send(&self, cmd: RegistryCommand) {
        if self.sender.send(cmd).await.is_err() {
            warn!("Registry actor is gone, command dropped");
        }
    }
}
