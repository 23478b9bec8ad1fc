//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Build the streamed success response from a fetched object
//! - Map routing and fetch failures to status codes and plain-text bodies
//! - Log each failure at the severity its kind warrants
//!
//! # Design Decisions
//! - Client-facing bodies are fixed strings; internal detail only goes to logs
//! - Client-side problems (bad method, unknown host, missing object) log at debug
//! - Backend problems log at error

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::routing::RouteError;
use crate::storage::{FetchError, FetchedObject};

/// Why a request did not produce an object.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl RequestError {
    /// Status code sent to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::Route(RouteError::MethodNotAllowed(_)) => StatusCode::METHOD_NOT_ALLOWED,
            RequestError::Route(RouteError::RouteNotFound(_)) => StatusCode::NOT_FOUND,
            RequestError::Fetch(FetchError::BackendUnavailable { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RequestError::Fetch(FetchError::ObjectNotFound { .. }) => StatusCode::NOT_FOUND,
            RequestError::Fetch(FetchError::StreamFailure { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Plain-text body sent to the client.
    pub fn message(&self) -> &'static str {
        match self {
            RequestError::Route(RouteError::MethodNotAllowed(_)) => "method not supported",
            RequestError::Route(RouteError::RouteNotFound(_)) => "resource not found",
            RequestError::Fetch(FetchError::BackendUnavailable { .. }) => "cannot connect to bucket",
            RequestError::Fetch(FetchError::ObjectNotFound { .. }) => "cannot find data",
            RequestError::Fetch(FetchError::StreamFailure { .. }) => "cannot fetch data",
        }
    }

    /// Record the failure in the log.
    pub fn log(&self) {
        if self.status().is_server_error() {
            tracing::error!(error = %self, status = self.status().as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = self.status().as_u16(), "Request rejected");
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}

/// Build the 200 response streaming `object` to the client.
pub fn object_response(object: FetchedObject) -> Response {
    let mut response = Response::new(Body::from_stream(object.body));
    let headers = response.headers_mut();
    if let Some(value) = object
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(len) = object.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    response
}
