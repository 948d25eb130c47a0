//! Error types for lookup-progress
//!
//! The error type here plays a double role: it is the crate's own `Result`
//! error, and it is the value the fetch subsystem attaches to a failed
//! request via [`set_error`](crate::LookupRequest::set_error). Because a
//! stored failure is handed out to any number of concurrent readers, the
//! type is `Clone` (all variants carry owned, cheaply clonable data).

use thiserror::Error;

/// Result type alias for lookup-progress operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lookup-progress
///
/// Variants cover the failure modes the underlying fetch subsystem can
/// report against a request. None of these are ever raised through the
/// polling surface; they are surfaced as values via
/// [`Request::error`](crate::Request::error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The underlying fetch of an index file failed
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The fetch did not complete within the subsystem's deadline
    #[error("fetch timed out after {seconds}s: {subject}")]
    Timeout {
        /// Subject of the request that timed out
        subject: String,
        /// Seconds elapsed before the subsystem gave up
        seconds: u64,
    },

    /// Fetched index data could not be parsed
    #[error("invalid index data: {0}")]
    InvalidIndex(String),

    /// The subject was not present in the index
    #[error("subject not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}
