//! Host-routed static site server backed by S3 buckets.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod storage;

pub use config::schema::BuckitConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
