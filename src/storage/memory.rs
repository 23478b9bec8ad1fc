//! In-memory object store.
//!
//! Serves objects from a process-local map. Test backend: its fault
//! injection and open/close accounting make every fetch exit path
//! observable. The binary always serves through S3.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::backend::{BucketConnector, BucketSession, ObjectReader, StorageError};
use crate::config::Binding;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Faults to inject for every request against one bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketFaults {
    /// Refuse to establish sessions.
    pub unavailable: bool,
    /// Fail the read after this many chunks have been produced.
    pub fail_after_chunks: Option<usize>,
    /// Sleep before producing each chunk.
    pub chunk_delay: Option<Duration>,
}

/// Which resource was released, in release order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Reader,
    Session,
}

/// Snapshot of acquire/release counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceCounts {
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    pub readers_opened: usize,
    pub readers_closed: usize,
}

impl ResourceCounts {
    /// Every acquired session and reader has been released.
    pub fn is_balanced(&self) -> bool {
        self.sessions_opened == self.sessions_closed && self.readers_opened == self.readers_closed
    }
}

#[derive(Debug)]
struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
}

#[derive(Debug, Default)]
struct Accounting {
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    readers_opened: AtomicUsize,
    readers_closed: AtomicUsize,
    releases: Mutex<Vec<Release>>,
}

impl Accounting {
    fn release(&self, what: Release) {
        match what {
            Release::Reader => self.readers_closed.fetch_add(1, Ordering::SeqCst),
            Release::Session => self.sessions_closed.fetch_add(1, Ordering::SeqCst),
        };
        if let Ok(mut log) = self.releases.lock() {
            log.push(what);
        }
    }
}

#[derive(Debug)]
struct Inner {
    objects: DashMap<(String, String), StoredObject>,
    faults: DashMap<String, BucketFaults>,
    accounting: Accounting,
    chunk_size: usize,
}

/// Connector over an in-process map of `(bucket, key) → object`.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    inner: Arc<Inner>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }
}

impl MemoryConnector {
    /// Create an empty store with the default chunk size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that streams objects in chunks of `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                objects: DashMap::new(),
                faults: DashMap::new(),
                accounting: Accounting::default(),
                chunk_size: chunk_size.max(1),
            }),
        }
    }

    /// Store an object.
    pub fn put(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.put_with_type(bucket, key, data, None);
    }

    /// Store an object with a media type.
    pub fn put_with_type(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        content_type: Option<&str>,
    ) {
        self.inner.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data: data.into(),
                content_type: content_type.map(ToOwned::to_owned),
            },
        );
    }

    /// Inject faults for all future requests against `bucket`.
    pub fn set_faults(&self, bucket: &str, faults: BucketFaults) {
        self.inner.faults.insert(bucket.to_string(), faults);
    }

    /// Current acquire/release counts.
    pub fn counts(&self) -> ResourceCounts {
        let a = &self.inner.accounting;
        ResourceCounts {
            sessions_opened: a.sessions_opened.load(Ordering::SeqCst),
            sessions_closed: a.sessions_closed.load(Ordering::SeqCst),
            readers_opened: a.readers_opened.load(Ordering::SeqCst),
            readers_closed: a.readers_closed.load(Ordering::SeqCst),
        }
    }

    /// Every release so far, oldest first.
    pub fn releases(&self) -> Vec<Release> {
        self.inner
            .accounting
            .releases
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BucketConnector for MemoryConnector {
    async fn connect(&self, binding: &Binding) -> Result<Box<dyn BucketSession>, StorageError> {
        let faults = self
            .inner
            .faults
            .get(&binding.bucket_name)
            .map(|f| f.clone())
            .unwrap_or_default();
        if faults.unavailable {
            return Err(StorageError::Unavailable(format!(
                "bucket {} is unreachable",
                binding.bucket_name
            )));
        }

        self.inner
            .accounting
            .sessions_opened
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            inner: self.inner.clone(),
            bucket: binding.bucket_name.clone(),
            faults,
        }))
    }
}

struct MemorySession {
    inner: Arc<Inner>,
    bucket: String,
    faults: BucketFaults,
}

#[async_trait]
impl BucketSession for MemorySession {
    async fn open(&self, key: &str) -> Result<Box<dyn ObjectReader>, StorageError> {
        let (data, content_type) = {
            let object = self
                .inner
                .objects
                .get(&(self.bucket.clone(), key.to_string()))
                .ok_or_else(|| StorageError::NotFound(format!("{}/{}", self.bucket, key)))?;
            (object.data.clone(), object.content_type.clone())
        };

        self.inner
            .accounting
            .readers_opened
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryReader {
            inner: self.inner.clone(),
            data,
            content_type,
            offset: 0,
            chunks_sent: 0,
            faults: self.faults.clone(),
        }))
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.inner.accounting.release(Release::Session);
    }
}

struct MemoryReader {
    inner: Arc<Inner>,
    data: Bytes,
    content_type: Option<String>,
    offset: usize,
    chunks_sent: usize,
    faults: BucketFaults,
}

#[async_trait]
impl ObjectReader for MemoryReader {
    fn content_length(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, StorageError> {
        if let Some(delay) = self.faults.chunk_delay {
            tokio::time::sleep(delay).await;
        }
        if self.faults.fail_after_chunks == Some(self.chunks_sent) {
            return Err(StorageError::Read(format!(
                "injected failure after {} chunks",
                self.chunks_sent
            )));
        }
        if self.offset >= self.data.len() {
            return Ok(None);
        }

        let end = (self.offset + self.inner.chunk_size).min(self.data.len());
        let chunk = self.data.slice(self.offset..end);
        self.offset = end;
        self.chunks_sent += 1;
        Ok(Some(chunk))
    }
}

impl Drop for MemoryReader {
    fn drop(&mut self) {
        self.inner.accounting.release(Release::Reader);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(bucket: &str) -> Binding {
        Binding::new("a.example.com", bucket, "us-east-1")
    }

    #[tokio::test]
    async fn streams_in_chunks() {
        let store = MemoryConnector::with_chunk_size(4);
        store.put("abucket", "index.html", "hello world");

        let session = store.connect(&binding("abucket")).await.unwrap();
        let mut reader = session.open("index.html").await.unwrap();
        assert_eq!(reader.content_length(), Some(11));

        let mut collected = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            assert!(chunk.len() <= 4);
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, b"hello world");

        drop(reader);
        drop(session);
        assert!(store.counts().is_balanced());
        assert_eq!(store.releases(), vec![Release::Reader, Release::Session]);
    }

    #[tokio::test]
    async fn missing_object_opens_no_reader() {
        let store = MemoryConnector::new();
        let session = store.connect(&binding("abucket")).await.unwrap();
        assert!(matches!(session.open("nope").await, Err(StorageError::NotFound(_))));
        drop(session);

        let counts = store.counts();
        assert_eq!(counts.readers_opened, 0);
        assert_eq!(counts.sessions_closed, 1);
    }

    #[tokio::test]
    async fn unavailable_bucket_refuses_session() {
        let store = MemoryConnector::new();
        store.set_faults(
            "abucket",
            BucketFaults {
                unavailable: true,
                ..BucketFaults::default()
            },
        );
        assert!(matches!(
            store.connect(&binding("abucket")).await,
            Err(StorageError::Unavailable(_))
        ));
        assert_eq!(store.counts(), ResourceCounts::default());
    }
}
