//! Object storage subsystem.
//!
//! # Data Flow
//! ```text
//! Matched Binding + request path
//!     → fetcher.rs (path → key, deadlines, streaming)
//!     → backend.rs traits: connect → open → next_chunk
//!         → s3.rs (AWS S3 / S3-compatible stores)
//!         → memory.rs (in-process store)
//!     → TransferBody (bounded channel of chunks)
//!     → HTTP response body
//! ```
//!
//! # Design Decisions
//! - Sessions are per request, never pooled
//! - Credentials are resolved per binding, per request
//! - Memory use is bounded by a few chunks regardless of object size

pub mod backend;
pub mod fetcher;
pub mod memory;
pub mod s3;

pub use backend::{BucketConnector, BucketSession, ObjectReader, StorageError};
pub use fetcher::{object_key, FetchError, FetchTimeouts, FetchedObject, ObjectFetcher, TransferBody};
pub use memory::MemoryConnector;
pub use s3::S3Connector;
