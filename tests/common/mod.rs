//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use buckit::config::{Binding, BuckitConfig, ConfigStore};
use buckit::http::HttpServer;
use buckit::lifecycle::{LifecycleError, LifecycleState, Shutdown};
use buckit::storage::MemoryConnector;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// A server running on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub state: watch::Receiver<LifecycleState>,
    pub updates: mpsc::UnboundedSender<BuckitConfig>,
    pub handle: JoinHandle<Result<(), LifecycleError>>,
}

impl TestServer {
    /// URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait until the server reports `state` (or later).
    pub async fn wait_for_state(&mut self, state: LifecycleState) {
        tokio::time::timeout(Duration::from_secs(5), self.state.wait_for(|s| *s >= state))
            .await
            .expect("server did not reach state in time")
            .expect("server state channel closed");
    }
}

/// Configuration with one binding per `(host, bucket)` pair.
pub fn config(hosts: &[(&str, &str)], shutdown_timeout: Duration) -> BuckitConfig {
    BuckitConfig {
        bindings: hosts
            .iter()
            .map(|(host, bucket)| Binding::new(*host, *bucket, "us-east-1"))
            .collect(),
        port: 0,
        shutdown_timeout,
    }
}

/// Start a server over `connector` and wait until it accepts connections.
pub async fn start_server(connector: &MemoryConnector, config: BuckitConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let store = Arc::new(ConfigStore::new(config).unwrap());
    let server = HttpServer::new(store, Arc::new(connector.clone()));
    let state = server.state();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let signal = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, config_updates, signal).await });

    let mut server = TestServer {
        addr,
        shutdown,
        state,
        updates,
        handle,
    };
    server.wait_for_state(LifecycleState::Listening).await;
    server
}

/// HTTP client that never pools or proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Issue a request with an explicit Host header.
pub async fn request(
    client: &reqwest::Client,
    server: &TestServer,
    method: reqwest::Method,
    host: &str,
    path: &str,
) -> reqwest::Response {
    client
        .request(method, server.url(path))
        .header(reqwest::header::HOST, host)
        .send()
        .await
        .expect("server unreachable")
}

/// Poll `check` until it returns true or the deadline passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
