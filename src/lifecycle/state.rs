//! Server lifecycle states and errors.

use std::time::Duration;

use thiserror::Error;

/// Where the server is in its lifecycle.
///
/// Transitions only move forward:
/// `Created → Listening → ShuttingDown → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    /// Constructed, not yet accepting connections.
    Created,
    /// Accepting connections.
    Listening,
    /// No longer accepting; draining in-flight connections.
    ShuttingDown,
    /// All connections closed.
    Stopped,
}

/// Failures that end the server.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("graceful shutdown timed out after {timeout:?}, force-closed {remaining} connection(s)")]
    ShutdownTimeout { timeout: Duration, remaining: u64 },

    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

impl LifecycleError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            LifecycleError::Bind { .. } | LifecycleError::Signal(_) => 1,
            LifecycleError::ShutdownTimeout { .. } => 2,
        }
    }
}
