//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, a read-only interface over
//! whatever hosts the edition PDFs (a static HTTP server, a local directory).
//! Backends report every failure as an error; collapsing failures into "does
//! not exist" is the job of [`DocumentStore`](crate::DocumentStore).

mod http;
mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::http::HttpBackend;
pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockBackend, Requests};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Unified read-only interface for document hosts.
///
/// # Path Handling
/// All paths are relative to the store root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use editions_storage::{backend::StorageBackend, error::Result};
///
/// async fn pdf_magic(backend: &dyn StorageBackend) -> Result<bool> {
///     let path = Path::new("Edition 9.pdf");
///     if !backend.exists(path).await? {
///         return Ok(false);
///     }
///     let head = backend.read_head(path, 5).await?;
///     Ok(head == b"%PDF-")
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Lightweight existence check that transfers no body.
    ///
    /// Hosts are allowed to reject the check outright (an HTTP server that
    /// answers `HEAD` with `405`); that surfaces as
    /// [`Unsupported`](crate::error::ErrorKind::Unsupported) rather than
    /// `Ok(false)` so callers can choose a different probe.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Read only the first N bytes.
    ///
    /// Doubles as the fallback existence probe (`bytes = 1` is a ranged
    /// `GET` of `bytes=0-0` over HTTP). If the file is smaller than `bytes`,
    /// returns the entire file. Returns
    /// [`NotFound`](crate::error::ErrorKind::NotFound) if the file does not
    /// exist.
    async fn read_head(&self, path: &Path, bytes: usize) -> Result<Vec<u8>>;
}
