//! CLI Error Types
//!
//! Only startup and output problems end up here; everything that goes wrong
//! per edition is reported as a gallery event instead.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A CLI error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("document store unavailable")]
    Store,
    #[display("exclusion patterns could not be compiled")]
    Exclusions,
    #[display("no usable PDF engine")]
    Engine,
    #[display("could not write {}", _0.display())]
    Export(#[error(not(source))] PathBuf),
    #[display("could not print output")]
    Output,
}
