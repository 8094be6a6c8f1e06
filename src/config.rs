//! Configuration types for the cache and its front ends.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::manifest::AssetManifest;

/// Configuration for one cache instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Bucket name; doubles as the cache version tag. Changing it is the
    /// only cache-invalidation mechanism.
    pub bucket: String,
    /// Base origin that relative manifest entries are resolved against.
    pub origin: String,
    /// Raw manifest entries (relative or absolute URLs).
    pub manifest: Vec<String>,
    /// Upper bound on concurrent fetches during population.
    pub concurrent_fetches: usize,
    /// Per-request timeout in seconds for population and fallback fetches.
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bucket: "chronozen-v1".to_string(),
            origin: "http://127.0.0.1:8080".to_string(),
            manifest: AssetManifest::chronozen().iter().map(String::from).collect(),
            concurrent_fetches: 4,
            timeout_secs: 30,
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bucket name.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Sets the origin used to resolve relative manifest entries.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Replaces the manifest entries.
    #[must_use]
    pub fn with_manifest<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the population concurrency bound.
    #[must_use]
    pub const fn with_concurrent_fetches(mut self, n: usize) -> Self {
        self.concurrent_fetches = n;
        self
    }

    /// Builds the [`AssetManifest`] view of the configured entries.
    #[must_use]
    pub fn asset_manifest(&self) -> AssetManifest {
        AssetManifest::new(self.manifest.iter().cloned())
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Path configuration for the on-disk store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    /// Root directory under which buckets are stored.
    pub cache_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            cache_dir: data_dir.join("zencache").join("buckets"),
        }
    }
}

/// Bind configuration for the serving front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9290,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cache instance configuration.
    pub cache: CacheConfig,
    /// Store paths.
    pub paths: PathConfig,
    /// Serving front end.
    pub serve: ServeConfig,
}

impl AppConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file. Missing sections fall back to
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
