//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Install signal handlers → Bind listener
//!     → Start config watcher → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown (first one only)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then signals, then the listener
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: connections are force-closed after the deadline

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use state::{LifecycleError, LifecycleState};
