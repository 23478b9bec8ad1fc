//! Request identification and tracing.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) unless the client sent one
//! - Echo the request ID on the response
//! - Open one tracing span per request carrying ID, method, URI and host
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer)
//! - Span fields are recorded from the request as received

use axum::http::{HeaderName, Request};
use tower_http::trace::MakeSpan;
use tracing::Span;

use crate::routing::matcher::request_host;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Builds the per-request tracing span.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");

        tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %request.method(),
            uri = %request.uri(),
            host = request_host(request).unwrap_or_default(),
        )
    }
}
