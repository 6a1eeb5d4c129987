//! Listener loop
//!
//! Accepts TCP connections, registers each one and hands it to its own
//! session task. Session tasks live in a `JoinSet`, so the loop can reap
//! them as they finish and abort the rest on shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::registry::Registry;
use crate::session::Session;

/// First pause after a failed accept
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);

/// Longest pause between accept retries
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause before retrying after `failures` consecutive accept errors
///
/// Doubles from `ACCEPT_BACKOFF_MIN` up to `ACCEPT_BACKOFF_MAX`.
fn accept_backoff(failures: u32) -> Duration {
    let factor = 1u32 << failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_MIN
        .saturating_mul(factor)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Bound listening socket plus the registry its sessions share
pub struct RelayListener {
    listener: TcpListener,
    registry: Registry,
    config: Config,
}

impl RelayListener {
    /// Bind to the configured address and start the registry
    ///
    /// A bind failure is fatal for the caller.
    pub async fn bind(config: Config) -> Result<Self, AppError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| AppError::Bind { addr, source })?;

        Ok(Self::from_listener(listener, config))
    }

    /// Use an already-bound socket
    pub fn from_listener(listener: TcpListener, config: Config) -> Self {
        let registry = Registry::spawn(config.registry_buffer_size);
        Self {
            listener,
            registry,
            config,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    /// Accept connections until `shutdown` completes
    ///
    /// Accept errors are logged and the loop continues after a short,
    /// growing pause (e.g. while out of file descriptors).
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let mut sessions = JoinSet::new();
        let mut accept_failures = 0u32;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        accept_failures = 0;
                        info!("New connection from {}", addr);
                        self.spawn_session(&mut sessions, stream, addr).await;
                    }
                    Err(e) => {
                        accept_failures = accept_failures.saturating_add(1);
                        let pause = accept_backoff(accept_failures);
                        error!("Failed to accept connection: {} (retrying in {:?})", e, pause);
                        sleep(pause).await;
                    }
                },
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        error!("Session task failed: {}", e);
                    }
                }
            }
        }

        info!("Stopping {} active session(s)", sessions.len());
        sessions.shutdown().await;
    }

    async fn spawn_session(
        &self,
        sessions: &mut JoinSet<()>,
        stream: TcpStream,
        addr: SocketAddr,
    ) {
        let (reader, writer) = stream.into_split();
        let (conn, session) = Session::new(
            addr.to_string(),
            reader,
            writer,
            self.registry.clone(),
            self.config.read_buffer_size,
        );

        self.registry.add(conn).await;

        sessions.spawn(async move {
            if let Err(e) = session.run().await {
                warn!("Session ended with error: {}", e);
            }
        });
    }
}
