//! HTTP API server

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tracing::info;

/// Bind the given address and serve until ctrl-c.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

/// Serve on an ephemeral loopback port, returning the bound address.
///
/// This is how the CLI and TUI reach the engine: they spin up the real
/// HTTP server locally and talk to it through [`crate::ApiClient`], so
/// every frontend exercises the same endpoint.
pub async fn spawn_ephemeral(state: AppState) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind ephemeral port")?;
    let addr = listener.local_addr().context("ephemeral server address")?;

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, create_router(state)).await;
    });

    Ok((addr, handle))
}
