//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use editions_render::error::ErrorKind as RenderErrorKind;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// The durable store refused an entry for its size.
    #[display("entry of {len} bytes exceeds the {quota} byte quota")]
    QuotaExceeded { len: usize, quota: usize },
    /// Rendering failed; shared by every caller waiting on the same render.
    #[display("cover could not be rendered: {_0}")]
    Render(RenderErrorKind),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Failed renders are never cached, so a retry always renders again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Render(kind) => kind.is_retryable(),
            Self::Database => true,
            Self::Migration | Self::QuotaExceeded { .. } => false,
        }
    }
}
