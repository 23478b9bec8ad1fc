//! Hot-swappable configuration store.
//!
//! # Responsibilities
//! - Hold the current configuration snapshot
//! - Hand out the snapshot with a single atomic load
//! - Validate and atomically install replacement snapshots
//!
//! # Design Decisions
//! - Snapshots are immutable `Arc<BuckitConfig>` values, replaced wholesale
//! - Readers never lock; a request keeps the `Arc` it loaded for its lifetime
//! - The listen port is captured at construction and never re-read
//! - Concurrent installs are last-validated-wins

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;

use crate::config::schema::BuckitConfig;
use crate::config::validation::{log_warnings, validate_config, ValidationError};
use crate::observability::metrics;

/// Owner of the live configuration snapshot.
#[derive(Debug)]
pub struct ConfigStore {
    port: u16,
    current: ArcSwap<BuckitConfig>,
}

impl ConfigStore {
    /// Create a store from the initial configuration.
    ///
    /// The initial snapshot is validated the same way as reloads; a failure
    /// here is meant to be fatal to startup.
    pub fn new(initial: BuckitConfig) -> Result<Self, Vec<ValidationError>> {
        validate_config(&initial)?;
        log_warnings(&initial);
        Ok(Self {
            port: initial.port,
            current: ArcSwap::from_pointee(initial),
        })
    }

    /// The port the listener was started with.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The latest installed snapshot.
    pub fn current(&self) -> Arc<BuckitConfig> {
        self.current.load_full()
    }

    /// Validate and install a new snapshot.
    ///
    /// On failure the previous snapshot stays in place.
    pub fn install(&self, config: BuckitConfig) -> Result<(), Vec<ValidationError>> {
        if let Err(errors) = validate_config(&config) {
            for error in &errors {
                tracing::error!(error = %error, "Rejected configuration");
            }
            metrics::record_reload(false);
            return Err(errors);
        }

        log_warnings(&config);
        if config.port != self.port {
            tracing::warn!(
                running_port = self.port,
                configured_port = config.port,
                "Port change ignored until restart"
            );
        }

        tracing::info!(
            bindings = config.bindings.len(),
            shutdown_timeout = ?config.shutdown_timeout,
            "Configuration updated"
        );
        self.current.store(Arc::new(config));
        metrics::record_reload(true);
        Ok(())
    }

    /// Install every configuration received until the sender side closes.
    pub async fn apply_updates(self: Arc<Self>, mut updates: mpsc::UnboundedReceiver<BuckitConfig>) {
        while let Some(config) = updates.recv().await {
            // Rejections are logged by `install`; the last good snapshot keeps serving.
            let _ = self.install(config);
        }
        tracing::debug!("Configuration update channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Binding;
    use std::time::Duration;

    fn config(hosts: &[&str]) -> BuckitConfig {
        BuckitConfig {
            bindings: hosts
                .iter()
                .map(|h| Binding::new(*h, format!("{h}-bucket"), "us-east-1"))
                .collect(),
            port: 8080,
            shutdown_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn rejects_invalid_initial_config() {
        let mut initial = config(&["a.example.com"]);
        initial.bindings[0].region.clear();
        assert!(ConfigStore::new(initial).is_err());
    }

    #[test]
    fn install_replaces_snapshot() {
        let store = ConfigStore::new(config(&["a.example.com"])).unwrap();
        let before = store.current();

        let mut next = config(&["a.example.com", "b.example.com"]);
        next.shutdown_timeout = Duration::from_secs(1);
        store.install(next).unwrap();

        let after = store.current();
        assert_eq!(after.bindings.len(), 2);
        assert_eq!(after.shutdown_timeout, Duration::from_secs(1));
        // A reader holding the old snapshot still sees it intact.
        assert_eq!(before.bindings.len(), 1);
        assert_eq!(before.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn failed_install_keeps_previous_snapshot() {
        let store = ConfigStore::new(config(&["a.example.com"])).unwrap();

        let mut bad = config(&["a.example.com", "b.example.com"]);
        bad.bindings[1].bucket_name.clear();
        bad.shutdown_timeout = Duration::from_secs(99);
        assert!(store.install(bad).is_err());

        let current = store.current();
        assert_eq!(*current, config(&["a.example.com"]));
    }

    #[test]
    fn port_is_fixed_at_construction() {
        let store = ConfigStore::new(config(&["a.example.com"])).unwrap();
        let mut moved = config(&["a.example.com"]);
        moved.port = 9999;
        store.install(moved).unwrap();

        assert_eq!(store.port(), 8080);
        assert_eq!(store.current().port, 9999);
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let store = Arc::new(ConfigStore::new(config(&["a.example.com"])).unwrap());
        let small = config(&["a.example.com"]);
        let large = config(&["a.example.com", "b.example.com", "c.example.com"]);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let (small, large) = (small.clone(), large.clone());
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        let snapshot = store.current();
                        assert!(*snapshot == small || *snapshot == large);
                    }
                })
            })
            .collect();

        for i in 0..1_000 {
            let next = if i % 2 == 0 { large.clone() } else { small.clone() };
            store.install(next).unwrap();
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[tokio::test]
    async fn applies_updates_from_channel() {
        let store = Arc::new(ConfigStore::new(config(&["a.example.com"])).unwrap());
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(store.clone().apply_updates(rx));

        tx.send(config(&["b.example.com"])).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(store.current().bindings[0].host_name, "b.example.com");
    }
}
