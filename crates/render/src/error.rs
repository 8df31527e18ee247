//! Render Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Kinds are `Clone` so a single failed render can be reported to every
/// caller that was waiting on it.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document bytes could not be fetched from the store.
    #[display("document could not be fetched")]
    Fetch,
    /// The PDF engine could not be loaded.
    #[display("PDF engine unavailable: {_0}")]
    EngineUnavailable(#[error(not(source))] String),
    /// Corrupt, encrypted or otherwise unsupported document.
    #[display("document could not be opened")]
    Open,
    /// The document has no first page.
    #[display("document has no pages")]
    MissingPage,
    #[display("page could not be rasterized")]
    Rasterize,
    #[display("thumbnail could not be encoded")]
    Encode,
    /// The blocking render task panicked or was cancelled.
    #[display("render task failed")]
    Worker,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch | Self::Worker)
    }
}
