//! Gallery Error Types
//!
//! Discovery and cover orchestration never fail as a whole; the only errors
//! left are in building the gallery from configuration.

use derive_more::{Display, Error};

/// A gallery error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for gallery operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An exclusion pattern is not a valid regular expression.
    #[display("invalid exclusion pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
