//! Bucket storage abstraction and its filesystem/in-memory implementations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::entry::{EntryMetadata, RequestKey, StoredResponse};

/// Abstraction over the named key-value store backing a cache bucket.
///
/// A bucket maps request identities to stored responses. Buckets are created
/// lazily on first write; writing an existing key overwrites the prior entry,
/// which is what makes repeated installs idempotent.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Stores one entry, replacing any previous value for the key.
    async fn put(
        &self,
        bucket: &str,
        key: &RequestKey,
        response: &StoredResponse,
    ) -> std::io::Result<()>;

    /// Looks up an entry; `None` on a miss.
    async fn get(&self, bucket: &str, key: &RequestKey) -> std::io::Result<Option<StoredResponse>>;

    /// Stores a batch of entries.
    ///
    /// Install stages all responses first and commits them through this in
    /// one call, so a failed install never leaves a partial bucket.
    async fn put_all(
        &self,
        bucket: &str,
        entries: &[(RequestKey, StoredResponse)],
    ) -> std::io::Result<()> {
        for (key, response) in entries {
            self.put(bucket, key, response).await?;
        }
        Ok(())
    }

    /// Returns true if the bucket currently exists in the store.
    async fn bucket_exists(&self, bucket: &str) -> std::io::Result<bool>;

    /// Lists the names of all buckets in the store.
    async fn list_buckets(&self) -> std::io::Result<Vec<String>>;

    /// Deletes a bucket and everything in it. Deleting a bucket that does
    /// not exist is not an error.
    async fn delete_bucket(&self, bucket: &str) -> std::io::Result<()>;
}

/// Default store persisting buckets as directories under a root path.
///
/// Each entry is two files named by the key hash: `<hash>.json` holding the
/// metadata (method, URL, status, headers) and `<hash>.body` holding the raw
/// body bytes. The metadata carries the original URL so bucket directories
/// stay inspectable with ordinary shell tools.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Creates a store rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_paths(&self, bucket: &str, key: &RequestKey) -> (PathBuf, PathBuf) {
        let stem = self.root.join(bucket).join(key.entry_name());
        (stem.with_extension("json"), stem.with_extension("body"))
    }
}

#[async_trait]
impl BucketStore for FsStore {
    async fn put(
        &self,
        bucket: &str,
        key: &RequestKey,
        response: &StoredResponse,
    ) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.root.join(bucket)).await?;
        let (meta_path, body_path) = self.entry_paths(bucket, key);
        let meta = serde_json::to_vec_pretty(&response.metadata(key))?;
        // Body first; the metadata file is what commits the entry, so a
        // crash between the two writes leaves no half-readable entry.
        tokio::fs::write(&body_path, &response.body).await?;
        tokio::fs::write(&meta_path, meta).await
    }

    async fn get(&self, bucket: &str, key: &RequestKey) -> std::io::Result<Option<StoredResponse>> {
        let (meta_path, body_path) = self.entry_paths(bucket, key);
        let meta_bytes = match tokio::fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let meta: EntryMetadata = serde_json::from_slice(&meta_bytes)?;
        // A metadata file without its body is a torn entry from an
        // interrupted write; report a miss so the request falls through to
        // the network instead of failing hard.
        let body = match tokio::fs::read(&body_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(meta.into_response(Bytes::from(body))))
    }

    async fn bucket_exists(&self, bucket: &str) -> std::io::Result<bool> {
        match tokio::fs::metadata(self.root.join(bucket)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_buckets(&self) -> std::io::Result<Vec<String>> {
        let mut buckets = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(buckets),
            Err(e) => return Err(e),
        };
        while let Some(item) = dir.next_entry().await? {
            if item.file_type().await?.is_dir() {
                buckets.push(item.file_name().to_string_lossy().into_owned());
            }
        }
        buckets.sort();
        Ok(buckets)
    }

    async fn delete_bucket(&self, bucket: &str) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(self.root.join(bucket)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// In-process store for embedding and tests. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, HashMap<RequestKey, StoredResponse>>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held in a bucket.
    #[must_use]
    pub fn entry_count(&self, bucket: &str) -> usize {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl BucketStore for MemoryStore {
    async fn put(
        &self,
        bucket: &str,
        key: &RequestKey,
        response: &StoredResponse,
    ) -> std::io::Result<()> {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.clone(), response.clone());
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &RequestKey) -> std::io::Result<Option<StoredResponse>> {
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn bucket_exists(&self, bucket: &str) -> std::io::Result<bool> {
        Ok(self.buckets.lock().unwrap().contains_key(bucket))
    }

    async fn list_buckets(&self) -> std::io::Result<Vec<String>> {
        let mut names: Vec<_> = self.buckets.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_bucket(&self, bucket: &str) -> std::io::Result<()> {
        self.buckets.lock().unwrap().remove(bucket);
        Ok(())
    }
}
