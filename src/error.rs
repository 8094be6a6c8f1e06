//! Error types for the zencache library.

use thiserror::Error;

/// Errors that can occur during cache population and serving.
#[derive(Error, Debug)]
pub enum Error {
    /// A manifest entry could not be pre-cached during install.
    ///
    /// Install is all-or-nothing: the first entry that fails aborts the
    /// whole attempt and nothing is committed to the bucket.
    #[error("failed to pre-cache {url}: {source}")]
    Population {
        /// The manifest URL that failed.
        url: String,
        /// The underlying fetch or store failure.
        #[source]
        source: Box<Error>,
    },

    /// The upstream answered a manifest fetch with a non-success status.
    #[error("upstream returned status {status} for {url}")]
    UpstreamStatus {
        /// The manifest URL that was fetched.
        url: String,
        /// The HTTP status code returned.
        status: u16,
    },

    /// HTTP transport error.
    ///
    /// On the interception path this is propagated to the caller untouched;
    /// no retry and no stale fallback content is substituted.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error from the bucket store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A manifest entry or origin could not be parsed as a URL.
    #[error("invalid URL {url}: {reason}")]
    Url {
        /// The offending URL string.
        url: String,
        /// Parse failure detail.
        reason: String,
    },

    /// Configuration file parsing failed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

/// A specialized `Result` type for zencache operations.
pub type Result<T> = std::result::Result<T, Error>;
