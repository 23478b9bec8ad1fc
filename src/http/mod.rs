//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1.1 connection, Axum router)
//!     → request.rs (request ID, tracing span)
//!     → [routing layer matches host to binding]
//!     → [storage layer streams the object]
//!     → response.rs (status mapping, streamed body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestSpan, X_REQUEST_ID};
pub use response::RequestError;
pub use server::HttpServer;
