//! The fixed list of assets pre-loaded into the cache at install time.

use std::collections::HashSet;

use reqwest::Url;

use crate::error::{Error, Result};

/// An ordered list of asset URLs considered essential for offline operation.
///
/// Fixed at construction and never mutated at runtime. Entries may be
/// origin-relative (`/`, `/style.css`) or absolute (external font resources);
/// relative entries are joined against the configured origin when the
/// manifest is resolved for fetching.
///
/// Duplicates are dropped at construction, keeping first-seen order, so that
/// install fetches and stores each URL exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    urls: Vec<String>,
}

impl AssetManifest {
    /// Builds a manifest from raw URL strings, deduplicating in order.
    #[must_use]
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let urls = urls
            .into_iter()
            .map(Into::into)
            .filter(|u| seen.insert(u.clone()))
            .collect();
        Self { urls }
    }

    /// The asset list of the ChronoZen clock page: the page itself, its
    /// stylesheet and script, and the externally hosted web fonts.
    #[must_use]
    pub fn chronozen() -> Self {
        Self::new([
            "/",
            "/index.html",
            "/style.css",
            "/app.js",
            "https://fonts.googleapis.com/css2?family=Poppins:wght@400;600&family=Lato&display=swap",
            "https://fonts.gstatic.com/s/poppins/v20/pxiByp8kv8JHgFVrLBT5Z1xlFQ.woff2",
            "https://fonts.gstatic.com/s/lato/v24/S6uyw4BMUTPHvxk.woff2",
        ])
    }

    /// Number of entries in the manifest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns true if the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Iterates over the raw (possibly relative) entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    /// Resolves every entry to an absolute URL against `origin`.
    ///
    /// Absolute entries are passed through unchanged; relative entries are
    /// joined against the origin. Order is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the origin or any entry fails to parse.
    pub fn resolve(&self, origin: &str) -> Result<Vec<String>> {
        let base = Url::parse(origin).map_err(|e| Error::Url {
            url: origin.to_string(),
            reason: e.to_string(),
        })?;

        self.urls
            .iter()
            .map(|raw| {
                let url = if raw.starts_with("http://") || raw.starts_with("https://") {
                    Url::parse(raw)
                } else {
                    base.join(raw)
                };
                url.map(String::from).map_err(|e| Error::Url {
                    url: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a AssetManifest {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&String) -> &str>;

    fn into_iter(self) -> Self::IntoIter {
        self.urls.iter().map(String::as_str)
    }
}
