//! Error types and handling for replica-core operations.
//!
//! Errors fall into two groups. Failures of the external collaborators
//! ([`FetchError`] and [`GenerationError`]) are terminal for a clone job and are
//! surfaced verbatim to the job result and every live subscriber. Everything
//! else is wrapped by the crate-level [`Error`].
//!
//! Extraction and repair never produce errors: they degrade to default values
//! or best-effort text instead.
//!
//! ## Error Categories
//!
//! - **Fetch Errors**: invalid URLs, unreachable hosts, empty pages
//! - **Generation Errors**: quota/rate limits, authentication, timeouts
//! - **Lookup Errors**: unknown job ids, documents requested too early
//! - **Configuration Errors**: invalid settings or config files
//!
//! ```rust
//! use replica_core::{Error, GenerationError};
//!
//! let err: Error = GenerationError::categorize("429 Too Many Requests").into();
//! assert_eq!(err.category(), "generation");
//! assert!(err.is_terminal());
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::types::JobStatus;

/// The main error type for replica-core operations.
///
/// All fallible public functions return [`Result<T, Error>`](Result).
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers reading and writing configuration files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed outside of a job pipeline.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The page fetcher could not produce usable markup.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The generative content service failed or timed out.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Requested job does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The job exists but is not in a state that allows the operation.
    ///
    /// Returned by document lookups for jobs that have not completed.
    #[error("Clone request is not completed (status: {status})")]
    Conflict {
        /// Status of the job at the time of the request.
        status: JobStatus,
    },

    /// URL is malformed or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Get the error category as a string identifier.
    ///
    /// Useful for structured logging and for grouping failures by cause.
    ///
    /// - `"io"`, `"network"`, `"fetch"`, `"generation"`, `"not_found"`,
    ///   `"conflict"`, `"invalid_url"`, `"config"`, `"serialization"`, `"other"`
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Fetch(_) => "fetch",
            Self::Generation(_) => "generation",
            Self::NotFound(_) => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }

    /// Whether this error ends a clone job.
    ///
    /// Fetch and generation failures are terminal: the core never retries, so a
    /// failed job must be resubmitted by the caller.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Generation(_))
    }
}

/// Failure reported by a [`PageFetcher`](crate::fetcher::PageFetcher).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The submitted URL cannot be parsed or has no host.
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    /// The fetch capability could not reach the page.
    #[error("Error scraping {url}: {reason}")]
    Unreachable {
        /// URL that was requested.
        url: String,
        /// Transport-level reason.
        reason: String,
    },

    /// The page answered with a non-success status.
    #[error("Error scraping {url}: HTTP {status}")]
    Status {
        /// URL that was requested.
        url: String,
        /// HTTP status code returned.
        status: u16,
    },

    /// The page was fetched but contained no markup.
    #[error("Failed to retrieve HTML content from {0}")]
    EmptyContent(String),
}

/// Failure reported by a [`ContentGenerator`](crate::generator::ContentGenerator).
///
/// Messages are caller-facing; they are copied into the job result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Quota exhausted or rate limited by the provider.
    #[error(
        "Failed to generate content: Quota exceeded or rate limit reached. Please try again later or upgrade your API plan."
    )]
    QuotaExceeded(String),

    /// Credentials rejected or missing permissions.
    #[error(
        "Failed to generate content: Authentication error. Please check your API key or service account credentials."
    )]
    Authentication(String),

    /// The generation call exceeded its time bound.
    #[error(
        "API call timed out after {}s. The request may be too complex or the model may be overloaded.",
        .0.as_secs()
    )]
    Timeout(Duration),

    /// Any other provider failure, reported verbatim.
    #[error("Failed to generate content: {0}")]
    Other(String),
}

impl GenerationError {
    /// Classify a raw provider error message.
    ///
    /// Matching is case-insensitive and checks quota markers before
    /// authentication markers:
    ///
    /// - `429`, `quota`, `rate limit` ⇒ [`GenerationError::QuotaExceeded`]
    /// - `403`, `authentication`, `permission`, `denied`, `mutually exclusive`
    ///   ⇒ [`GenerationError::Authentication`]
    /// - anything else ⇒ [`GenerationError::Other`]
    ///
    /// ```rust
    /// use replica_core::GenerationError;
    ///
    /// assert!(matches!(
    ///     GenerationError::categorize("Resource has been exhausted (check quota)"),
    ///     GenerationError::QuotaExceeded(_)
    /// ));
    /// assert!(matches!(
    ///     GenerationError::categorize("403 PERMISSION_DENIED"),
    ///     GenerationError::Authentication(_)
    /// ));
    /// ```
    #[must_use]
    pub fn categorize(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("429") || lower.contains("quota") || lower.contains("rate limit") {
            Self::QuotaExceeded(raw.to_string())
        } else if lower.contains("403")
            || lower.contains("authentication")
            || lower.contains("permission")
            || lower.contains("denied")
            || lower.contains("mutually exclusive")
        {
            Self::Authentication(raw.to_string())
        } else {
            Self::Other(raw.to_string())
        }
    }

    /// Short identifier of the failure cause.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::QuotaExceeded(_) => "quota",
            Self::Authentication(_) => "authentication",
            Self::Timeout(_) => "timeout",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
