//! Object fetch pipeline.
//!
//! # Responsibilities
//! - Map a request path to an object key
//! - Open a session and a read stream for the matched binding
//! - Stream object bytes to the client without buffering the object
//! - Release the reader, then the session, on every exit path
//!
//! # Design Decisions
//! - The first chunk is read before the response is committed, so failures
//!   that happen before any byte is produced still get a proper status
//! - Later failures abort the body; the client sees a truncated transfer
//! - A dropped response body (client gone, connection force-closed) stops
//!   the backend read immediately

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::backend::{BucketConnector, BucketSession, ObjectReader, StorageError};
use crate::config::Binding;
use crate::net::{READ_TIMEOUT, WRITE_TIMEOUT};
use crate::observability::metrics;

/// Key served when the request path is empty.
pub const INDEX_KEY: &str = "index.html";

/// Chunks buffered between the backend read and the client write.
const CHANNEL_CHUNKS: usize = 4;

/// Errors from fetching one object.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot connect to bucket {bucket}: {source}")]
    BackendUnavailable {
        bucket: String,
        #[source]
        source: StorageError,
    },

    #[error("object {bucket}/{key} not found")]
    ObjectNotFound { bucket: String, key: String },

    #[error("reading {bucket}/{key} failed: {reason}")]
    StreamFailure {
        bucket: String,
        key: String,
        reason: String,
    },
}

/// Deadlines applied to each blocking step of a fetch.
#[derive(Debug, Clone, Copy)]
pub struct FetchTimeouts {
    /// Longest wait for one backend call (connect, open or chunk read).
    pub backend: Duration,
    /// Longest wait for the client to accept one chunk.
    pub client_write: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            backend: READ_TIMEOUT,
            client_write: WRITE_TIMEOUT,
        }
    }
}

/// Convert a request path into an object key.
///
/// The path is percent-decoded and its leading `/` dropped; an empty result
/// becomes [`INDEX_KEY`].
pub fn object_key(path: &str) -> String {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let key = decoded.strip_prefix('/').unwrap_or(&decoded);
    if key.is_empty() {
        INDEX_KEY.to_string()
    } else {
        key.to_string()
    }
}

/// An object ready to be streamed to the client.
#[derive(Debug)]
pub struct FetchedObject {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: TransferBody,
}

/// Fetches objects through a [`BucketConnector`].
#[derive(Clone)]
pub struct ObjectFetcher {
    connector: Arc<dyn BucketConnector>,
    timeouts: FetchTimeouts,
}

impl ObjectFetcher {
    pub fn new(connector: Arc<dyn BucketConnector>) -> Self {
        Self {
            connector,
            timeouts: FetchTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: FetchTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Fetch the object at `path` from the binding's bucket.
    pub async fn fetch(&self, binding: &Binding, path: &str) -> Result<FetchedObject, FetchError> {
        let key = object_key(path);
        let bucket = binding.bucket_name.clone();

        let session = match timeout(self.timeouts.backend, self.connector.connect(binding)).await {
            Ok(Ok(session)) => session,
            Ok(Err(source)) => return Err(FetchError::BackendUnavailable { bucket, source }),
            Err(_) => {
                return Err(FetchError::BackendUnavailable {
                    bucket,
                    source: StorageError::Unavailable("connect timed out".into()),
                })
            }
        };

        // From here on, returning drops the session.
        let reader = match timeout(self.timeouts.backend, session.open(&key)).await {
            Ok(Ok(reader)) => reader,
            Ok(Err(StorageError::NotFound(_))) => {
                return Err(FetchError::ObjectNotFound { bucket, key })
            }
            Ok(Err(StorageError::Read(reason))) => {
                return Err(FetchError::StreamFailure { bucket, key, reason })
            }
            Ok(Err(source)) => return Err(FetchError::BackendUnavailable { bucket, source }),
            Err(_) => {
                return Err(FetchError::BackendUnavailable {
                    bucket,
                    source: StorageError::Unavailable("open timed out".into()),
                })
            }
        };

        let mut transfer = Transfer {
            reader,
            _session: session,
            bucket,
            key,
        };

        let first = match timeout(self.timeouts.backend, transfer.reader.next_chunk()).await {
            Ok(Ok(first)) => first,
            Ok(Err(e)) => return Err(transfer.failure(e.to_string())),
            Err(_) => return Err(transfer.failure("read timed out".into())),
        };

        let content_type = transfer.reader.content_type().map(ToOwned::to_owned);
        let content_length = transfer.reader.content_length();
        let body = match first {
            Some(chunk) => TransferBody::spawn(transfer, chunk, self.timeouts),
            None => TransferBody::empty(),
        };

        Ok(FetchedObject {
            content_type,
            content_length,
            body,
        })
    }
}

/// Resources held while an object is being streamed.
///
/// Fields drop in declaration order: the reader is released before the
/// session it was opened from.
struct Transfer {
    reader: Box<dyn ObjectReader>,
    _session: Box<dyn BucketSession>,
    bucket: String,
    key: String,
}

impl Transfer {
    fn failure(&self, reason: String) -> FetchError {
        FetchError::StreamFailure {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            reason,
        }
    }
}

impl Drop for Transfer {
    fn drop(&mut self) {
        tracing::trace!(bucket = %self.bucket, key = %self.key, "Releasing object reader and session");
    }
}

enum Outcome {
    Complete,
    Cancelled,
    Failed(String),
    WriteTimeout,
}

/// Copy chunks from the backend into the response channel until the object
/// ends, the client goes away, or something fails.
async fn pump(
    mut transfer: Transfer,
    first: Bytes,
    tx: mpsc::Sender<Bytes>,
    aborted: Arc<AtomicBool>,
    timeouts: FetchTimeouts,
) {
    let mut pending = Some(first);
    let mut sent: u64 = 0;

    let outcome = loop {
        let chunk = match pending.take() {
            Some(chunk) => chunk,
            None => {
                let read = tokio::select! {
                    _ = tx.closed() => break Outcome::Cancelled,
                    read = timeout(timeouts.backend, transfer.reader.next_chunk()) => read,
                };
                match read {
                    Ok(Ok(Some(chunk))) => chunk,
                    Ok(Ok(None)) => break Outcome::Complete,
                    Ok(Err(e)) => break Outcome::Failed(e.to_string()),
                    Err(_) => break Outcome::Failed("read timed out".into()),
                }
            }
        };

        let len = chunk.len() as u64;
        match timeout(timeouts.client_write, tx.send(chunk)).await {
            Ok(Ok(())) => sent += len,
            Ok(Err(_)) => break Outcome::Cancelled,
            Err(_) => break Outcome::WriteTimeout,
        }
    };

    metrics::record_bytes_streamed(sent);
    match outcome {
        Outcome::Complete => {
            tracing::debug!(bucket = %transfer.bucket, key = %transfer.key, bytes = sent, "Object streamed");
        }
        Outcome::Cancelled => {
            tracing::debug!(
                bucket = %transfer.bucket,
                key = %transfer.key,
                bytes = sent,
                "Client went away, transfer cancelled"
            );
        }
        Outcome::Failed(reason) => {
            aborted.store(true, Ordering::SeqCst);
            tracing::error!(
                bucket = %transfer.bucket,
                key = %transfer.key,
                bytes = sent,
                error = %reason,
                "Stream failed after response started, truncating"
            );
        }
        Outcome::WriteTimeout => {
            aborted.store(true, Ordering::SeqCst);
            tracing::warn!(
                bucket = %transfer.bucket,
                key = %transfer.key,
                bytes = sent,
                "Client write timed out, truncating"
            );
        }
    }

    // The abort flag must be visible before the channel closes.
    drop(tx);
    drop(transfer);
}

/// Response body fed by a background transfer.
///
/// Yields an error instead of a clean end when the transfer was aborted, so
/// the connection is closed without completing the message.
#[derive(Debug)]
pub struct TransferBody {
    rx: Option<mpsc::Receiver<Bytes>>,
    aborted: Arc<AtomicBool>,
}

impl TransferBody {
    fn empty() -> Self {
        Self {
            rx: None,
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    fn spawn(transfer: Transfer, first: Bytes, timeouts: FetchTimeouts) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CHUNKS);
        let aborted = Arc::new(AtomicBool::new(false));
        tokio::spawn(pump(transfer, first, tx, aborted.clone(), timeouts));
        Self {
            rx: Some(rx),
            aborted,
        }
    }
}

impl Stream for TransferBody {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(None);
        };
        match rx.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(None) => {
                self.rx = None;
                if self.aborted.load(Ordering::SeqCst) {
                    Poll::Ready(Some(Err(io::Error::other("object transfer aborted"))))
                } else {
                    Poll::Ready(None)
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
