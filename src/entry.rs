//! Request identity and stored-response types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity of an intercepted request: method plus absolute URL.
///
/// The method is normalized to uppercase so that `get` and `GET` address the
/// same bucket entry. In practice the manifest is GET-only, but the key keeps
/// the method so a cached GET is never served for a HEAD or POST.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    /// Uppercase HTTP method.
    pub method: String,
    /// Absolute request URL.
    pub url: String,
}

impl RequestKey {
    /// Creates a key from a method and URL, normalizing the method.
    #[must_use]
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.into(),
        }
    }

    /// Shorthand for a GET key (the only method the manifest uses).
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Stable hex name for this key, used as the on-disk entry file stem.
    ///
    /// SHA-256 over `"METHOD URL"`; hex output keeps entry names safe for any
    /// filesystem regardless of what characters the URL contains.
    #[must_use]
    pub fn entry_name(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

/// An exact capture of one HTTP response: status, headers, and body.
///
/// Responses are stored and replayed verbatim; the cache never rewrites
/// status codes or headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in wire order.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Bytes,
}

impl StoredResponse {
    /// Returns true for 2xx statuses.
    ///
    /// Install refuses to cache non-success responses; interception passes
    /// them through untouched.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Splits off the serializable metadata (everything but the body).
    #[must_use]
    pub fn metadata(&self, key: &RequestKey) -> EntryMetadata {
        EntryMetadata {
            method: key.method.clone(),
            url: key.url.clone(),
            status: self.status,
            headers: self.headers.clone(),
        }
    }
}

/// On-disk metadata for one bucket entry, stored as JSON next to the raw body.
///
/// Carrying the original method and URL in the metadata keeps bucket
/// directories inspectable without reversing the entry-name hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Uppercase HTTP method of the cached request.
    pub method: String,
    /// Absolute URL of the cached request.
    pub url: String,
    /// HTTP status code of the stored response.
    pub status: u16,
    /// Response headers in wire order.
    pub headers: Vec<(String, String)>,
}

impl EntryMetadata {
    /// Reassembles a [`StoredResponse`] from metadata plus a body.
    #[must_use]
    pub fn into_response(self, body: Bytes) -> StoredResponse {
        StoredResponse {
            status: self.status,
            headers: self.headers,
            body,
        }
    }
}
