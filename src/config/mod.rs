//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BuckitConfig (validated, immutable)
//!     → store.rs (installed as the current snapshot)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs reads new config (parse only)
//!     → store.rs validates, then atomically swaps Arc<BuckitConfig>
//!     → requests starting afterwards observe the new snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - Only bindings and shutdown timeout take effect on reload; the port is fixed
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{Binding, BuckitConfig};
pub use store::ConfigStore;
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
