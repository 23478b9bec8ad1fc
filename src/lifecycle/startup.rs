//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize subsystems in dependency order
//! - Start the config watcher for hot reload
//! - Bind the listener and begin accepting traffic
//! - Map the outcome to a process exit code
//!
//! # Design Decisions
//! - Signal handlers are registered first, before the config is even read
//! - Fail fast: an unreadable or invalid config file is fatal
//! - A watcher that cannot start disables hot reload but does not stop serving
//! - Listener starts last (traffic only when ready)

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::{load_config, ConfigStore, ConfigWatcher};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::listener;
use crate::storage::BucketConnector;

/// Exit code for a clean shutdown.
pub const EXIT_OK: u8 = 0;
/// Exit code for configuration or startup failures.
pub const EXIT_STARTUP_FAILURE: u8 = 1;

/// Run the server from the config file at `config_path` until SIGINT or
/// SIGTERM.
///
/// Signal handlers are registered before anything else, so a signal that
/// arrives during startup is held and stops the server once it listens.
/// Returns the process exit code.
pub async fn run(config_path: &Path, connector: Arc<dyn BucketConnector>) -> u8 {
    let shutdown = Shutdown::new();
    let signal_task = match signals::install(shutdown.clone()) {
        Ok(task) => task,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start");
            return e.exit_code();
        }
    };

    let code = serve(config_path, connector, shutdown).await;
    signal_task.abort();
    code
}

/// Run the server from the config file at `config_path` until `shutdown`
/// is triggered.
///
/// A trigger that fired before the listener was bound is not lost. Returns
/// the process exit code.
pub async fn serve(
    config_path: &Path,
    connector: Arc<dyn BucketConnector>,
    shutdown: Shutdown,
) -> u8 {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = ?config_path, error = %e, "Cannot start without a valid config file");
            return EXIT_STARTUP_FAILURE;
        }
    };
    tracing::info!(
        path = ?config_path,
        bindings = config.bindings.len(),
        port = config.port,
        "Configuration loaded"
    );

    let store = match ConfigStore::new(config) {
        Ok(store) => Arc::new(store),
        Err(errors) => {
            for error in &errors {
                tracing::error!(error = %error, "Invalid configuration");
            }
            return EXIT_STARTUP_FAILURE;
        }
    };

    let listener = match listener::bind(store.port()).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start");
            return e.exit_code();
        }
    };

    let (watcher, updates) = ConfigWatcher::new(config_path);
    // Dropping the watcher stops notifications, so it lives until `serve` returns.
    let (_watcher, updates) = match watcher.run() {
        Ok(handle) => (Some(handle), updates),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher failed to start; hot reload disabled");
            let (_, closed) = mpsc::unbounded_channel();
            (None, closed)
        }
    };

    let server = HttpServer::new(store, connector);
    match server.run(listener, updates, shutdown.subscribe()).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            EXIT_OK
        }
        Err(e) => {
            tracing::error!(error = %e, "Shutdown did not complete cleanly");
            e.exit_code()
        }
    }
}
