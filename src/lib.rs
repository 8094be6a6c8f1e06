//! zencache - an offline asset cache with cache-first serving.
//!
//! This library pre-populates a named cache bucket with a fixed manifest of
//! asset URLs and then answers intercepted requests cache-first, falling back
//! to the network on a miss. Population is all-or-nothing and interception
//! never writes back: the bucket stays a curated copy of the manifest.
//!
//! # Example
//!
//! ```no_run
//! use zencache::{CacheConfig, NoProgress, OfflineAssetCache, RequestKey};
//!
//! # async fn example() -> zencache::Result<()> {
//! let config = CacheConfig::new()
//!     .with_bucket("chronozen-v1")
//!     .with_origin("http://127.0.0.1:8080")
//!     .with_manifest(["/", "/index.html", "/style.css", "/app.js"]);
//!
//! let cache = OfflineAssetCache::open(config, "/var/cache/zencache")?;
//!
//! // Fetch and store the whole manifest as a unit.
//! let stats = cache.install(&NoProgress).await?;
//! println!("cached {} assets", stats.assets_cached);
//!
//! // Served from the bucket, no network round-trip.
//! let page = cache.intercept(&RequestKey::get("http://127.0.0.1:8080/")).await?;
//! assert_eq!(page.status, 200);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod stats;
pub mod store;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "serve")]
pub mod serve;

// Re-export main types for convenience
pub use cache::{CacheState, InstallProgress, NoProgress, OfflineAssetCache};
pub use config::{AppConfig, CacheConfig, PathConfig, ServeConfig};
pub use entry::{EntryMetadata, RequestKey, StoredResponse};
pub use error::{Error, Result};
pub use fetch::{Fetcher, ReqwestFetcher};
pub use manifest::AssetManifest;
pub use stats::{InstallStats, ServeSnapshot, ServeStats};
pub use store::{BucketStore, FsStore, MemoryStore};
