//! Backend abstraction shared by every object store implementation.
//!
//! A request walks three levels, each released when dropped:
//! `BucketConnector::connect` yields a per-request `BucketSession`,
//! `BucketSession::open` yields an `ObjectReader`, and the reader is
//! drained chunk by chunk.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::Binding;

/// Errors reported by object store backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached or refused the session.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The requested object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Reading object data failed.
    #[error("read failed: {0}")]
    Read(String),
}

/// Opens per-request sessions against the store a binding points to.
#[async_trait]
pub trait BucketConnector: Send + Sync + 'static {
    /// Establish a session for one request, using the binding's region and
    /// credentials (or the process default credential chain).
    async fn connect(&self, binding: &Binding) -> Result<Box<dyn BucketSession>, StorageError>;
}

/// A connection to one bucket, alive for a single request.
#[async_trait]
pub trait BucketSession: Send + Sync {
    /// Open a read stream for the object stored under `key`.
    async fn open(&self, key: &str) -> Result<Box<dyn ObjectReader>, StorageError>;
}

/// A streaming reader over one object's bytes.
#[async_trait]
pub trait ObjectReader: Send {
    /// Total object size, when the store reports it.
    fn content_length(&self) -> Option<u64>;

    /// Media type, when the store reports it.
    fn content_type(&self) -> Option<&str>;

    /// Next chunk of data, or `None` once the object is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, StorageError>;
}
