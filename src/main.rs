//! buckit
//!
//! Serves static sites out of S3 buckets, choosing the bucket by the
//! request's Host header.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶  net listener ──▶ http server ──▶ routing (Host → Binding)
//!                                                              │
//!                                                              ▼
//!     Client Response                                    storage fetcher
//!     ◀───────────────  streamed body ◀──────────────── (S3 GetObject)
//!
//!     Cross-cutting: config (load, validate, watch, swap), lifecycle
//!     (signals, graceful drain), observability (logs, metrics)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use buckit::lifecycle::startup;
use buckit::observability::logging::{self, LogFormat};
use buckit::observability::metrics;
use buckit::storage::S3Connector;

#[derive(Parser, Debug)]
#[command(name = "buckit", version, about = "Serve S3 buckets by Host header", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = ".buckit.toml")]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Expose Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "buckit starting");

    if let Some(addr) = cli.metrics_address {
        metrics::init_metrics(addr);
    }

    let code = startup::run(&cli.config, Arc::new(S3Connector::new())).await;
    ExitCode::from(code)
}
