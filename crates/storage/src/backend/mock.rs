//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Number of requests a [`MockBackend`] has served, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requests {
    pub exists: usize,
    pub read: usize,
    pub read_head: usize,
}

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Every request is
/// counted, and the backend can be told to behave like a host that rejects
/// `HEAD` requests so the ranged fallback probe gets exercised.
///
/// # Examples
///
/// ```ignore
/// use editions_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("Edition 9.pdf", b"%PDF-1.7")]);
/// assert!(backend.exists(Path::new("Edition 9.pdf")).await?);
/// assert_eq!(backend.requests().exists, 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, Vec<u8>>>,
    reject_exists: bool,
    exists_calls: AtomicUsize,
    read_calls: AtomicUsize,
    read_head_calls: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            reject_exists: false,
            exists_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            read_head_calls: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Answer every lightweight existence check with
    /// [`Unsupported`](ErrorKind::Unsupported), like a host that refuses
    /// `HEAD`.
    pub fn rejecting_exists(mut self) -> Self {
        self.reject_exists = true;
        self
    }

    /// Add or replace a file after construction.
    pub async fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        let path = path.into();
        let Ok(validated) = validate_path(&path) else {
            panic!("MockBackend::insert: invalid path {}", path.display());
        };
        self.storage.write().await.insert(validated, data.into());
    }

    pub fn requests(&self) -> Requests {
        Requests {
            exists: self.exists_calls.load(Ordering::SeqCst),
            read: self.read_calls.load(Ordering::SeqCst),
            read_head: self.read_head_calls.load(Ordering::SeqCst),
        }
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        let path = validate_path(path)?;
        if self.reject_exists {
            exn::bail!(ErrorKind::Unsupported("HEAD".to_string()));
        }
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        let path = validate_path(path)?;
        let data = self.storage.read().await.get(&path).cloned();
        data.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn read_head(&self, path: &Path, bytes: usize) -> Result<Vec<u8>> {
        self.read_head_calls.fetch_add(1, Ordering::SeqCst);
        let path = validate_path(path)?;
        let guard = self.storage.read().await;
        let data = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        let end = bytes.min(data.len());
        Ok(data[..end].to_vec())
    }
}
