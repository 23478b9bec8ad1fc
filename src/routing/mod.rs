//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, host)
//!     → router.rs (method check, snapshot load)
//!     → matcher.rs (host extraction, first-match scan)
//!     → Return: RouteMatch (binding + snapshot) or RouteError
//! ```
//!
//! # Design Decisions
//! - One atomic snapshot load per request
//! - Deterministic: same snapshot and host always match the same binding
//! - First match wins (list order)

pub mod matcher;
pub mod router;

pub use router::{RouteError, RouteMatch, Router};
