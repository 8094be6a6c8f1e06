//! Core offline cache: install-time population and cache-first interception.

use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Instant;

use futures::{StreamExt, stream};

use crate::config::CacheConfig;
use crate::entry::{RequestKey, StoredResponse};
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::stats::{InstallStats, ServeSnapshot, ServeStats};
use crate::store::{BucketStore, FsStore};

/// Lifecycle state of one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No install has been attempted yet.
    Uninstalled,
    /// An install is fetching the manifest.
    Populating,
    /// The manifest is fully stored; the bucket is serving.
    Active,
    /// The last install attempt failed. A new `install` call may retry;
    /// retry policy belongs to the hosting environment, not the cache.
    InstallFailed,
}

/// Trait for receiving per-asset callbacks during install.
///
/// All methods have default no-op implementations.
pub trait InstallProgress: Send + Sync {
    /// Called when an asset fetch starts.
    fn on_asset_start(&self, _url: &str) {}

    /// Called when an asset has been fetched and staged.
    fn on_asset_staged(&self, _url: &str, _bytes: u64) {}

    /// Called when an asset fetch fails.
    fn on_asset_failed(&self, _url: &str, _error: &str) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl InstallProgress for NoProgress {}

/// The offline asset cache: one named bucket, a fixed manifest, and a
/// cache-first-with-network-fallback serving policy.
///
/// Population is all-or-nothing: every manifest response is staged in memory
/// and committed to the bucket only after the last fetch has succeeded, so a
/// failed install never leaves a partially populated bucket behind.
///
/// Interception never writes back: a miss is forwarded to the network and the
/// result returned verbatim, but the bucket stays a curated copy of the
/// manifest and nothing else.
pub struct OfflineAssetCache<S: BucketStore = FsStore, N: Fetcher = ReqwestFetcher> {
    store: S,
    net: N,
    config: CacheConfig,
    state: RwLock<CacheState>,
    stats: ServeStats,
}

impl OfflineAssetCache<FsStore, ReqwestFetcher> {
    /// Opens a cache over an on-disk store rooted at `cache_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn open(config: CacheConfig, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let net = ReqwestFetcher::new(config.timeout())?;
        Ok(Self::with_parts(FsStore::new(cache_dir), net, config))
    }
}

impl<S: BucketStore, N: Fetcher> OfflineAssetCache<S, N> {
    /// Creates a cache from explicit store and fetcher implementations.
    #[must_use]
    pub const fn with_parts(store: S, net: N, config: CacheConfig) -> Self {
        Self {
            store,
            net,
            config,
            state: RwLock::new(CacheState::Uninstalled),
            stats: ServeStats::new(),
        }
    }

    /// Returns the cache configuration.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Current lifecycle state.
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    #[must_use]
    pub fn state(&self) -> CacheState {
        *self.state.read().unwrap()
    }

    /// Snapshot of the serving counters.
    #[must_use]
    pub fn serve_stats(&self) -> ServeSnapshot {
        self.stats.snapshot()
    }

    fn set_state(&self, next: CacheState) {
        *self.state.write().unwrap() = next;
    }

    /// Fetches every manifest entry and commits the bucket as a unit.
    ///
    /// Fetches run concurrently, bounded by `concurrent_fetches`. Each entry
    /// must come back with a success status; the first transport error or
    /// non-success status fails the whole attempt and nothing is written.
    /// Re-running install against the same bucket overwrites the previous
    /// entries, so repeated installs are idempotent.
    ///
    /// # Errors
    ///
    /// [`Error::Population`] or [`Error::UpstreamStatus`] if any manifest
    /// entry cannot be cached; [`Error::Url`] if the origin or an entry does
    /// not parse; [`Error::Io`] if the commit to the store fails.
    pub async fn install(&self, progress: &dyn InstallProgress) -> Result<InstallStats> {
        let started = Instant::now();
        self.set_state(CacheState::Populating);

        let resolved = match self.config.asset_manifest().resolve(&self.config.origin) {
            Ok(urls) => urls,
            Err(e) => {
                self.set_state(CacheState::InstallFailed);
                return Err(e);
            }
        };

        let results: Vec<Result<(RequestKey, StoredResponse)>> = stream::iter(&resolved)
            .map(|url| async move {
                progress.on_asset_start(url);
                let key = RequestKey::get(url.clone());
                let staged = match self.net.fetch(&key).await {
                    Ok(resp) if resp.is_success() => Ok((key, resp)),
                    Ok(resp) => Err(Error::UpstreamStatus {
                        url: url.clone(),
                        status: resp.status,
                    }),
                    Err(e) => Err(Error::Population {
                        url: url.clone(),
                        source: Box::new(e),
                    }),
                };
                match &staged {
                    Ok((_, resp)) => progress.on_asset_staged(url, resp.body.len() as u64),
                    Err(e) => progress.on_asset_failed(url, &e.to_string()),
                }
                staged
            })
            .buffer_unordered(self.config.concurrent_fetches.max(1))
            .collect()
            .await;

        let mut staged = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(entry) => staged.push(entry),
                Err(e) => {
                    log::warn!("install of bucket {} aborted: {e}", self.config.bucket);
                    self.set_state(CacheState::InstallFailed);
                    return Err(e);
                }
            }
        }

        let total_bytes = staged.iter().map(|(_, r)| r.body.len() as u64).sum();
        if let Err(e) = self.store.put_all(&self.config.bucket, &staged).await {
            self.set_state(CacheState::InstallFailed);
            return Err(e.into());
        }

        self.set_state(CacheState::Active);
        let stats = InstallStats {
            assets_cached: staged.len(),
            total_bytes,
            elapsed: started.elapsed(),
        };
        log::info!(
            "bucket {} populated: {} assets, {} bytes",
            self.config.bucket,
            stats.assets_cached,
            stats.total_bytes
        );
        Ok(stats)
    }

    /// Answers one intercepted request: bucket first, network on a miss.
    ///
    /// A hit is returned unchanged with zero network access. A miss is
    /// forwarded to the network and the result — whatever its status —
    /// returned verbatim, without being written back to the bucket. A network
    /// failure on a miss propagates untouched; no stale content is
    /// substituted.
    ///
    /// Interception is valid in any state; during population a request may
    /// simply miss and fall through to the network.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the bucket lookup fails, or the forwarded network
    /// error on an uncached request.
    pub async fn intercept(&self, key: &RequestKey) -> Result<StoredResponse> {
        if let Some(hit) = self.store.get(&self.config.bucket, key).await? {
            self.stats.record_hit();
            log::debug!("cache hit: {} {}", key.method, key.url);
            return Ok(hit);
        }

        self.stats.record_miss();
        log::debug!("cache miss, forwarding: {} {}", key.method, key.url);
        match self.net.fetch(key).await {
            Ok(response) => Ok(response),
            Err(e) => {
                self.stats.record_network_error();
                Err(e)
            }
        }
    }

    /// Deletes every bucket in the store except the configured one.
    ///
    /// This is the formalized version sweep: rotating the bucket name and
    /// then sweeping retires the previous version's entries. Never called
    /// implicitly by [`install`](Self::install).
    ///
    /// Returns the names of the buckets that were deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if listing or deleting buckets fails.
    pub async fn sweep_stale_buckets(&self) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for bucket in self.store.list_buckets().await? {
            if bucket != self.config.bucket {
                self.store.delete_bucket(&bucket).await?;
                log::info!("swept stale bucket {bucket}");
                deleted.push(bucket);
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    /// A scripted network: URLs map to canned responses, everything else is
    /// unreachable. Counts every fetch.
    #[derive(Default)]
    struct MockFetcher {
        responses: Mutex<HashMap<String, StoredResponse>>,
        fetches: AtomicUsize,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self::default()
        }

        fn serve(&self, url: &str, status: u16, body: &'static [u8]) {
            self.responses.lock().unwrap().insert(
                url.to_string(),
                StoredResponse {
                    status,
                    headers: vec![("x-mock".to_string(), "1".to_string())],
                    body: Bytes::from_static(body),
                },
            );
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, key: &RequestKey) -> Result<StoredResponse> {
            self.fetches.fetch_add(1, Ordering::Relaxed);
            self.responses
                .lock()
                .unwrap()
                .get(&key.url)
                .cloned()
                .ok_or_else(|| {
                    Error::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        format!("unreachable: {}", key.url),
                    ))
                })
        }
    }

    fn test_config(manifest: &[&str]) -> CacheConfig {
        CacheConfig::new()
            .with_bucket("app-v1")
            .with_origin("http://localhost")
            .with_manifest(manifest.iter().copied())
            .with_concurrent_fetches(2)
    }

    fn cache_with(
        manifest: &[&str],
        net: MockFetcher,
    ) -> OfflineAssetCache<MemoryStore, MockFetcher> {
        OfflineAssetCache::with_parts(MemoryStore::new(), net, test_config(manifest))
    }

    #[tokio::test]
    async fn install_populates_every_manifest_entry_once() {
        let net = MockFetcher::new();
        net.serve("http://localhost/", 200, b"<html>");
        net.serve("http://localhost/a.css", 200, b"body{}");

        let cache = cache_with(&["/", "/a.css"], net);
        let stats = cache.install(&NoProgress).await.unwrap();

        assert_eq!(stats.assets_cached, 2);
        assert_eq!(stats.total_bytes, 12);
        assert_eq!(cache.state(), CacheState::Active);
        assert_eq!(cache.net.fetch_count(), 2);

        // Every manifest URL is now answered from the bucket with no
        // further network access.
        for url in ["http://localhost/", "http://localhost/a.css"] {
            let resp = cache.intercept(&RequestKey::get(url)).await.unwrap();
            assert_eq!(resp.status, 200);
        }
        assert_eq!(cache.net.fetch_count(), 2);
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let net = MockFetcher::new();
        net.serve("http://localhost/", 200, b"<html>");
        // "/broken.js" is never scripted, so its fetch fails.

        let cache = cache_with(&["/", "/broken.js"], net);
        let err = cache.install(&NoProgress).await.unwrap_err();

        assert!(matches!(err, Error::Population { .. }));
        assert_eq!(cache.state(), CacheState::InstallFailed);
        // Nothing was committed, not even the entry that fetched fine.
        assert_eq!(cache.store.entry_count("app-v1"), 0);
    }

    #[tokio::test]
    async fn install_rejects_non_success_status() {
        let net = MockFetcher::new();
        net.serve("http://localhost/", 200, b"<html>");
        net.serve("http://localhost/gone.css", 404, b"not found");

        let cache = cache_with(&["/", "/gone.css"], net);
        let err = cache.install(&NoProgress).await.unwrap_err();

        assert!(matches!(err, Error::UpstreamStatus { status: 404, .. }));
        assert_eq!(cache.state(), CacheState::InstallFailed);
        assert_eq!(cache.store.entry_count("app-v1"), 0);
    }

    #[tokio::test]
    async fn install_fails_on_unparsable_origin() {
        let net = MockFetcher::new();
        let mut config = test_config(&["/"]);
        config.origin = "not a url".to_string();
        let cache = OfflineAssetCache::with_parts(MemoryStore::new(), net, config);

        assert!(matches!(
            cache.install(&NoProgress).await.unwrap_err(),
            Error::Url { .. }
        ));
        assert_eq!(cache.state(), CacheState::InstallFailed);
    }

    #[tokio::test]
    async fn reinstall_is_idempotent() {
        let net = MockFetcher::new();
        net.serve("http://localhost/", 200, b"<html>");

        let cache = cache_with(&["/"], net);
        cache.install(&NoProgress).await.unwrap();
        cache.install(&NoProgress).await.unwrap();

        assert_eq!(cache.state(), CacheState::Active);
        assert_eq!(cache.store.entry_count("app-v1"), 1);

        let fetches_after_installs = cache.net.fetch_count();
        let resp = cache
            .intercept(&RequestKey::get("http://localhost/"))
            .await
            .unwrap();
        assert_eq!(resp.body, Bytes::from_static(b"<html>"));
        assert_eq!(cache.net.fetch_count(), fetches_after_installs);
    }

    #[tokio::test]
    async fn failed_install_can_be_retried() {
        let net = MockFetcher::new();
        net.serve("http://localhost/", 200, b"<html>");

        let cache = cache_with(&["/", "/late.css"], net);
        cache.install(&NoProgress).await.unwrap_err();
        assert_eq!(cache.state(), CacheState::InstallFailed);

        // The missing asset appears; the environment retries the install.
        cache.net.serve("http://localhost/late.css", 200, b"p{}");
        cache.install(&NoProgress).await.unwrap();
        assert_eq!(cache.state(), CacheState::Active);
        assert_eq!(cache.store.entry_count("app-v1"), 2);
    }

    #[tokio::test]
    async fn miss_forwards_exactly_once_and_verbatim() {
        let net = MockFetcher::new();
        net.serve("http://localhost/", 200, b"<html>");
        net.serve("http://localhost/missing.js", 404, b"nope");

        let cache = cache_with(&["/"], net);
        cache.install(&NoProgress).await.unwrap();

        let before = cache.net.fetch_count();
        let resp = cache
            .intercept(&RequestKey::get("http://localhost/missing.js"))
            .await
            .unwrap();

        // Status and body come back untouched, even for a 404.
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, Bytes::from_static(b"nope"));
        assert_eq!(cache.net.fetch_count(), before + 1);
    }

    #[tokio::test]
    async fn miss_is_not_written_back() {
        let net = MockFetcher::new();
        net.serve("http://localhost/", 200, b"<html>");
        net.serve("http://localhost/extra.css", 200, b"q{}");

        let cache = cache_with(&["/"], net);
        cache.install(&NoProgress).await.unwrap();

        let key = RequestKey::get("http://localhost/extra.css");
        cache.intercept(&key).await.unwrap();
        // The bucket still holds only the manifest.
        assert_eq!(cache.store.entry_count("app-v1"), 1);
        // A second interception goes to the network again.
        let before = cache.net.fetch_count();
        cache.intercept(&key).await.unwrap();
        assert_eq!(cache.net.fetch_count(), before + 1);
    }

    #[tokio::test]
    async fn miss_network_failure_propagates() {
        let net = MockFetcher::new();
        net.serve("http://localhost/", 200, b"<html>");

        let cache = cache_with(&["/"], net);
        cache.install(&NoProgress).await.unwrap();

        let err = cache
            .intercept(&RequestKey::get("http://localhost/offline.js"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(cache.serve_stats().network_errors, 1);
    }

    #[tokio::test]
    async fn intercept_before_install_falls_through() {
        let net = MockFetcher::new();
        net.serve("http://localhost/early.js", 200, b"x");

        let cache = cache_with(&["/"], net);
        assert_eq!(cache.state(), CacheState::Uninstalled);

        let resp = cache
            .intercept(&RequestKey::get("http://localhost/early.js"))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(cache.serve_stats().misses, 1);
    }

    #[tokio::test]
    async fn serve_stats_track_hits_and_misses() {
        let net = MockFetcher::new();
        net.serve("http://localhost/", 200, b"<html>");
        net.serve("http://localhost/m.js", 200, b"x");

        let cache = cache_with(&["/"], net);
        cache.install(&NoProgress).await.unwrap();

        cache.intercept(&RequestKey::get("http://localhost/")).await.unwrap();
        cache.intercept(&RequestKey::get("http://localhost/")).await.unwrap();
        cache.intercept(&RequestKey::get("http://localhost/m.js")).await.unwrap();

        let snap = cache.serve_stats();
        assert_eq!(snap.hits, 2);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.total(), 3);
    }

    #[tokio::test]
    async fn sweep_deletes_only_other_buckets() {
        let net = MockFetcher::new();
        net.serve("http://localhost/", 200, b"<html>");

        let cache = cache_with(&["/"], net);
        cache.install(&NoProgress).await.unwrap();

        // A previous version's bucket is still lying around.
        let old_key = RequestKey::get("http://localhost/old.css");
        let old_resp = StoredResponse {
            status: 200,
            headers: vec![],
            body: Bytes::from_static(b"old"),
        };
        cache.store.put("app-v0", &old_key, &old_resp).await.unwrap();

        let deleted = cache.sweep_stale_buckets().await.unwrap();
        assert_eq!(deleted, vec!["app-v0".to_string()]);
        assert_eq!(cache.store.entry_count("app-v0"), 0);
        assert_eq!(cache.store.entry_count("app-v1"), 1);
    }

    #[tokio::test]
    async fn progress_callbacks_fire_per_asset() {
        #[derive(Default)]
        struct Recorder {
            staged: Mutex<Vec<String>>,
            failed: Mutex<Vec<String>>,
        }

        impl InstallProgress for Recorder {
            fn on_asset_staged(&self, url: &str, _bytes: u64) {
                self.staged.lock().unwrap().push(url.to_string());
            }
            fn on_asset_failed(&self, url: &str, _error: &str) {
                self.failed.lock().unwrap().push(url.to_string());
            }
        }

        let net = MockFetcher::new();
        net.serve("http://localhost/", 200, b"<html>");

        let cache = cache_with(&["/", "/nope.css"], net);
        let recorder = Recorder::default();
        cache.install(&recorder).await.unwrap_err();

        assert_eq!(recorder.staged.lock().unwrap().as_slice(), ["http://localhost/"]);
        assert_eq!(
            recorder.failed.lock().unwrap().as_slice(),
            ["http://localhost/nope.css"]
        );
    }

    #[test]
    fn no_progress_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoProgress>();
    }
}
