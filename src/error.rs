//! Error types and result handling for mokuroku operations.
//!
//! All operations return a [`Result<T>`], a type alias for
//! `std::result::Result<T, Error>`.
//!
//! Expected upstream failures (a catalog API answering 500, a timeout, a
//! malformed JSON body) are deliberately NOT errors at the fetch boundary:
//! [`FetchOutcome`](crate::net::FetchOutcome) carries them as values so that
//! callers can cache, degrade, or merge around them. The [`enum@Error`] type
//! is for conditions the caller cannot reasonably continue past: missing
//! configuration, a request path that has nothing left to serve, or an
//! upstream failure escalated at a boundary where no degradation exists.
//!
//! # Examples
//!
//! ```rust
//! use mokuroku::{Error, Result};
//!
//! fn require_base(base: Option<&str>) -> Result<&str> {
//!     base.ok_or_else(|| Error::config("missing catalog API base URL"))
//! }
//!
//! assert!(require_base(None).is_err());
//! ```

use thiserror::Error;

/// Type alias for Results with mokuroku errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all mokuroku operations.
///
/// # Variants
///
/// * [`Config`](Error::Config) - Required configuration is absent
/// * [`Network`](Error::Network) - HTTP client and connection errors
/// * [`Parse`](Error::Parse) - Data parsing and format errors
/// * [`Json`](Error::Json) - JSON serialization errors
/// * [`Upstream`](Error::Upstream) - An upstream failure with no fallback
/// * [`NotFound`](Error::NotFound) - Missing resources
/// * [`Other`](Error::Other) - Generic error messages
#[derive(Error, Debug)]
pub enum Error {
    /// Required configuration is missing.
    ///
    /// Produced when an operation needs a base URL (or similar setting) that
    /// was never provided. Fatal for the calling request path; never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-related errors from HTTP operations.
    ///
    /// Wraps errors from the underlying HTTP client (reqwest): connection
    /// timeouts, DNS resolution failures, TLS errors.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Data parsing and format errors.
    ///
    /// Used when received data cannot be interpreted as expected, such as a
    /// payload missing every known list envelope.
    #[error("Parse error: {0}")]
    Parse(String),

    /// JSON serialization and deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An upstream failure surfaced at a boundary with no fallback.
    ///
    /// Most upstream failures are absorbed by the merge pipeline (partial
    /// data plus a warning). When an operation depends on a single source
    /// and that source failed, the cached failure message is escalated here.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Resource not found errors.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic error messages.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a configuration error with the given message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mokuroku::Error;
    ///
    /// let error = Error::config("missing comics API base URL");
    /// ```
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Creates a parse error with the given message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mokuroku::Error;
    ///
    /// let error = Error::parse("no recognised list field in payload");
    /// ```
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Creates an upstream error with the given message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mokuroku::Error;
    ///
    /// let error = Error::upstream("Request failed with 502");
    /// ```
    pub fn upstream(msg: impl Into<String>) -> Self {
        Error::Upstream(msg.into())
    }

    /// Creates a not found error with the given message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mokuroku::Error;
    ///
    /// let error = Error::not_found("comic with slug 'unknown-comic'");
    /// ```
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }
}
