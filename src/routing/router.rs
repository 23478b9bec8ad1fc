//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Reject methods other than GET before any lookup
//! - Load the configuration snapshot once per request
//! - Return the matched binding or an explicit no-match
//!
//! # Design Decisions
//! - The snapshot travels with the match, so a reload mid-request is never observed
//! - O(n) scan over bindings (acceptable for typical binding counts)
//! - Never mutates the configuration store

use std::sync::Arc;

use axum::http::{Method, Request};
use thiserror::Error;

use crate::config::{Binding, BuckitConfig, ConfigStore};
use crate::routing::matcher::{first_match, request_host};

/// Why a request could not be routed to a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("method {0} not supported")]
    MethodNotAllowed(Method),

    #[error("no binding for host {0:?}")]
    RouteNotFound(String),
}

/// A binding matched within the snapshot that was current when routing began.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    snapshot: Arc<BuckitConfig>,
    index: usize,
}

impl RouteMatch {
    /// The matched binding.
    pub fn binding(&self) -> &Binding {
        &self.snapshot.bindings[self.index]
    }

    /// The configuration snapshot the match was made against.
    pub fn snapshot(&self) -> &Arc<BuckitConfig> {
        &self.snapshot
    }
}

/// Maps requests to bindings using the current configuration.
#[derive(Debug, Clone)]
pub struct Router {
    store: Arc<ConfigStore>,
}

impl Router {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }

    /// Route a request to the first binding matching its host.
    pub fn route<B>(&self, req: &Request<B>) -> Result<RouteMatch, RouteError> {
        if req.method() != Method::GET {
            return Err(RouteError::MethodNotAllowed(req.method().clone()));
        }

        let snapshot = self.store.current();
        let host = request_host(req).unwrap_or_default();
        match first_match(&snapshot.bindings, host) {
            Some(index) => Ok(RouteMatch { snapshot, index }),
            None => Err(RouteError::RouteNotFound(host.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn router(hosts: &[&str]) -> (Router, Arc<ConfigStore>) {
        let config = BuckitConfig {
            bindings: hosts
                .iter()
                .enumerate()
                .map(|(i, h)| Binding::new(*h, format!("bucket-{i}"), "us-east-1"))
                .collect(),
            ..BuckitConfig::default()
        };
        let store = Arc::new(ConfigStore::new(config).unwrap());
        (Router::new(store.clone()), store)
    }

    fn request(method: Method, host: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/")
            .header("Host", host)
            .body(Body::default())
            .unwrap()
    }

    #[test]
    fn test_non_get_rejected_for_any_host() {
        let (router, _) = router(&["a.example.com"]);
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD, Method::PATCH] {
            for host in ["a.example.com", "unknown.example.com"] {
                assert_eq!(
                    router.route(&request(method.clone(), host)).unwrap_err(),
                    RouteError::MethodNotAllowed(method.clone())
                );
            }
        }
    }

    #[test]
    fn test_unknown_host_not_found() {
        let (router, _) = router(&["a.example.com"]);
        assert_eq!(
            router.route(&request(Method::GET, "z.example.com")).unwrap_err(),
            RouteError::RouteNotFound("z.example.com".into())
        );
    }

    #[test]
    fn test_duplicate_host_resolves_to_first() {
        let (router, _) = router(&["a.example.com", "a.example.com"]);
        for _ in 0..5 {
            let matched = router.route(&request(Method::GET, "a.example.com")).unwrap();
            assert_eq!(matched.binding().bucket_name, "bucket-0");
        }
    }

    #[test]
    fn test_match_keeps_its_snapshot() {
        let (router, store) = router(&["a.example.com"]);
        let matched = router.route(&request(Method::GET, "a.example.com")).unwrap();

        let replacement = BuckitConfig {
            bindings: vec![Binding::new("b.example.com", "new", "us-east-1")],
            ..BuckitConfig::default()
        };
        store.install(replacement).unwrap();

        assert_eq!(matched.binding().bucket_name, "bucket-0");
        assert!(router.route(&request(Method::GET, "a.example.com")).is_err());
        assert!(router.route(&request(Method::GET, "b.example.com")).is_ok());
    }
}
