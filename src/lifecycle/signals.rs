//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate the first signal into a shutdown trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered synchronously, before the listener accepts, so
//!   an early signal is queued rather than lost
//! - Signals after the first are logged and otherwise ignored
//! - SIGKILL cannot be caught and is not registered

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::state::LifecycleError;

/// Register SIGINT/SIGTERM handlers and spawn the task that turns them into
/// a shutdown trigger.
#[cfg(unix)]
pub fn install(shutdown: Shutdown) -> Result<JoinHandle<()>, LifecycleError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).map_err(LifecycleError::Signal)?;
    let mut terminate = signal(SignalKind::terminate()).map_err(LifecycleError::Signal)?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = interrupt.recv() => "SIGINT",
                Some(()) = terminate.recv() => "SIGTERM",
                else => break,
            };
            on_signal(&shutdown, name);
        }
    }))
}

/// Register the Ctrl+C handler and spawn the task that turns it into a
/// shutdown trigger.
#[cfg(not(unix))]
pub fn install(shutdown: Shutdown) -> Result<JoinHandle<()>, LifecycleError> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            on_signal(&shutdown, "Ctrl+C");
        }
    }))
}

fn on_signal(shutdown: &Shutdown, name: &str) {
    if shutdown.trigger() {
        tracing::info!(signal = name, "Captured signal, stopping gracefully");
    } else {
        tracing::info!(signal = name, "Already shutting down, signal ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_signals_trigger_once() {
        let shutdown = Shutdown::new();
        on_signal(&shutdown, "SIGTERM");
        assert!(shutdown.is_triggered());
        on_signal(&shutdown, "SIGINT");
        assert!(!shutdown.trigger());
    }
}
