use crate::error::Result;
use crate::{BackendHandle, Document};
use std::path::Path;
use tracing::instrument;

/// Client for the document store, as seen by discovery and rendering.
///
/// Wraps a [`BackendHandle`] and the URL prefix the documents are published
/// under. Existence checks never fail: every error a backend reports is
/// logged and read as "does not exist".
#[derive(Clone)]
pub struct DocumentStore {
    backend: BackendHandle,
    prefix: String,
}

impl DocumentStore {
    pub fn new(backend: BackendHandle, prefix: impl Into<String>) -> Self {
        Self { backend, prefix: prefix.into() }
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Canonical reference for `file` under this store's prefix.
    pub fn document(&self, file: impl Into<String>) -> Document {
        Document::new(&self.prefix, file)
    }

    /// Whether `file` exists on the host.
    ///
    /// Tries the backend's lightweight check first. When that is negative or
    /// rejected, a one-byte ranged read decides instead; hosts that refuse
    /// `HEAD` or answer it inconsistently still serve byte ranges (or the
    /// whole body, which is accepted too).
    #[instrument(level = "trace", skip(self), fields(backend = self.backend.name()))]
    pub async fn exists(&self, file: &str) -> bool {
        let path = Path::new(file);
        match self.backend.exists(path).await {
            Ok(true) => return true,
            Ok(false) => tracing::trace!("Lightweight check negative; trying ranged probe"),
            Err(e) => tracing::debug!(error = ?e, "Lightweight check failed; trying ranged probe"),
        }
        match self.backend.read_head(path, 1).await {
            Ok(_) => true,
            Err(e) => {
                tracing::trace!(error = ?e, "Ranged probe failed; treating as absent");
                false
            },
        }
    }

    /// Full contents of `file`.
    pub async fn read(&self, file: &str) -> Result<Vec<u8>> {
        self.backend.read(Path::new(file)).await
    }

    /// Fetch and parse the JSON resource `name`.
    ///
    /// Absence, transport failures and malformed JSON all yield `None`; a
    /// missing manifest is a normal deployment, not an error.
    #[instrument(level = "debug", skip(self), fields(backend = self.backend.name()))]
    pub async fn manifest(&self, name: &str) -> Option<serde_json::Value> {
        let bytes = match self.backend.read(Path::new(name)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = ?e, "No manifest available");
                return None;
            },
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "Manifest is not valid JSON; ignoring it");
                None
            },
        }
    }
}
