//! TCP listener setup.
//!
//! # Responsibilities
//! - Bind to the configured port on all interfaces
//! - Report bind failures as fatal lifecycle errors

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::lifecycle::LifecycleError;

/// Bind the listener on `port` on all interfaces.
pub async fn bind(port: u16) -> Result<TcpListener, LifecycleError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| LifecycleError::Bind { port, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| LifecycleError::Bind { port, source })?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}
