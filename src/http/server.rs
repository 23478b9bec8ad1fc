//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create the Axum Router with the bucket handler
//! - Wire up middleware (request ID, tracing)
//! - Accept connections and serve HTTP/1.1 with fixed transport limits
//! - Dispatch requests to the routing engine and object fetcher
//! - Install configuration updates while serving
//! - Drain connections on shutdown, force-closing at the timeout

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tower::Service;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::{BuckitConfig, ConfigStore};
use crate::http::request::RequestSpan;
use crate::http::response::{object_response, RequestError};
use crate::lifecycle::{LifecycleError, LifecycleState, ShutdownSignal};
use crate::net::connection::ConnectionTracker;
use crate::net::{MAX_HEADER_BYTES, READ_TIMEOUT};
use crate::observability::metrics;
use crate::routing::Router as BucketRouter;
use crate::storage::{BucketConnector, ObjectFetcher};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: BucketRouter,
    pub fetcher: ObjectFetcher,
}

/// HTTP server fronting the configured buckets.
pub struct HttpServer {
    router: Router,
    store: Arc<ConfigStore>,
    tracker: ConnectionTracker,
    state_tx: watch::Sender<LifecycleState>,
}

impl HttpServer {
    /// Create a new HTTP server fetching objects through `connector`.
    pub fn new(store: Arc<ConfigStore>, connector: Arc<dyn BucketConnector>) -> Self {
        Self::with_fetcher(store, ObjectFetcher::new(connector))
    }

    /// Create a new HTTP server with a preconfigured fetcher.
    pub fn with_fetcher(store: Arc<ConfigStore>, fetcher: ObjectFetcher) -> Self {
        let state = AppState {
            router: BucketRouter::new(store.clone()),
            fetcher,
        };
        let (state_tx, _) = watch::channel(LifecycleState::Created);

        Self {
            router: build_router(state),
            store,
            tracker: ConnectionTracker::new(),
            state_tx,
        }
    }

    /// The Axum router serving requests, for driving it without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Observe lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires, then drain.
    ///
    /// Returns an error if the shutdown timeout elapsed and connections had
    /// to be force-closed.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<BuckitConfig>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), LifecycleError> {
        let reload = tokio::spawn(self.store.clone().apply_updates(config_updates));

        let mut http = http1::Builder::new();
        http.timer(TokioTimer::new())
            .header_read_timeout(READ_TIMEOUT)
            .max_buf_size(MAX_HEADER_BYTES);

        let graceful = GracefulShutdown::new();
        let mut connections = JoinSet::new();

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(
                address = %addr,
                bindings = self.store.current().bindings.len(),
                "Ready to listen"
            );
        }
        self.state_tx.send_replace(LifecycleState::Listening);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };

                    let guard = self.tracker.track();
                    tracing::debug!(peer_addr = %peer, connection_id = %guard.id(), "Connection accepted");

                    let app = self.router.clone();
                    let service = hyper::service::service_fn(move |request: Request<Incoming>| {
                        app.clone().call(request)
                    });
                    let conn = graceful.watch(http.serve_connection(TokioIo::new(stream), service));

                    connections.spawn(async move {
                        if let Err(e) = conn.await {
                            tracing::debug!(connection_id = %guard.id(), error = %e, "Connection error");
                        }
                        drop(guard);
                    });
                }
            }

            while connections.try_join_next().is_some() {}
        }

        // Refuse new connections from here on.
        drop(listener);
        self.state_tx.send_replace(LifecycleState::ShuttingDown);

        let timeout = self.store.current().shutdown_timeout;
        tracing::info!(
            timeout = ?timeout,
            in_flight = self.tracker.active_count(),
            "Stopping gracefully"
        );

        let result = match tokio::time::timeout(timeout, graceful.shutdown()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                let remaining = self.tracker.active_count();
                connections.abort_all();
                Err(LifecycleError::ShutdownTimeout { timeout, remaining })
            }
        };
        while connections.join_next().await.is_some() {}

        reload.abort();
        self.state_tx.send_replace(LifecycleState::Stopped);
        tracing::info!("HTTP server stopped");
        result
    }
}

/// Build the Axum router with all middleware layers.
fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(bucket_handler)
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Main handler: route by host, then stream the object.
async fn bucket_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();

    let response = match serve_object(&state, request).await {
        Ok(response) => response,
        Err(e) => {
            e.log();
            e.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), start_time);
    response
}

async fn serve_object(state: &AppState, request: Request<Body>) -> Result<Response, RequestError> {
    // Only the head is needed; GET bodies are ignored.
    let (parts, _) = request.into_parts();
    let head = Request::from_parts(parts, ());

    let matched = state.router.route(&head)?;
    tracing::debug!(
        bucket = %matched.binding().bucket_name,
        path = %head.uri().path(),
        "Fetching object"
    );

    let object = state
        .fetcher
        .fetch(matched.binding(), head.uri().path())
        .await?;
    Ok(object_response(object))
}
