//! TCP Chat Relay - Entry Point
//!
//! Parses the optional port argument, binds the listener and relays until
//! Ctrl-C.

use std::env;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_relay::{config, Config, RelayListener};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    let config = match Config::from_args(env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            println!("{}", config::usage());
            return Ok(());
        }
    };

    let listener = match RelayListener::bind(config).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    info!("Relay started on {}. Waiting for clients...", listener.local_addr()?);

    listener
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Relay stopped");
    Ok(())
}
