//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind on the configured port)
//!     → connection.rs (lifecycle tracking for graceful shutdown)
//!     → Hand off to HTTP layer
//!
//! Connection States:
//!     Active → Draining → Closed (or force-closed at shutdown timeout)
//! ```
//!
//! # Design Decisions
//! - Transport limits are fixed, not configurable
//! - Each connection tracked for graceful shutdown

use std::time::Duration;

pub mod connection;
pub mod listener;

/// Deadline for reading request headers, and for each backend call.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for the client to accept each chunk of a response.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum size of the request header buffer.
pub const MAX_HEADER_BYTES: usize = 1 << 20;
