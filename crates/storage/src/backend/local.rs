//! Local filesystem storage backend.
//!
//! Serves documents out of a directory on disk, for deployments where the
//! PDFs sit next to the process rather than behind a web server. Files are
//! accessed via `tokio::fs` for async I/O.

use crate::error::ErrorKind;
use crate::{StorageBackend, error::Result, path::validate as validate_path};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Local filesystem storage backend.
///
/// All paths are relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use editions_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("docs", "/srv/www/public/docs")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    /// Directory holding the edition PDFs
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if `root` is not
    /// absolute, and [`NotFound`](ErrorKind::NotFound) if it is not an
    /// existing directory. The store is read-only, so a missing root is never
    /// created.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        // Non-async on purpose: runs once at startup.
        if !root.is_dir() {
            exn::bail!(ErrorKind::NotFound(root));
        }
        Ok(Self { name: name.into(), root })
    }

    /// Validate a relative storage path and join it with the root directory.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        match fs::metadata(&abs_path).await {
            // Directories named like a PDF are not documents.
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(exn::Exn::from(Self::map_io_error(e, path))),
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn read_head(&self, path: &Path, bytes: usize) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        let mut buffer = Vec::with_capacity(bytes);
        file.take(bytes as u64).read_to_end(&mut buffer).await.map_err(ErrorKind::Io)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(files: &[(&str, &[u8])]) -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        for (name, data) in files {
            std::fs::write(temp_dir.path().join(name), data).unwrap();
        }
        let backend = LocalBackend::new("local", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_existing_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("local", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("local", "relative/docs").is_err());
        let missing = LocalBackend::new("local", temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(&*missing, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_exists() {
        let (dir, backend) = setup(&[("Edition 9.pdf", b"%PDF-1.7")]);
        std::fs::create_dir(dir.path().join("Edition 8.pdf")).unwrap();
        assert!(backend.exists(Path::new("Edition 9.pdf")).await.unwrap());
        assert!(!backend.exists(Path::new("Edition 8.pdf")).await.unwrap());
        assert!(!backend.exists(Path::new("Edition 7.pdf")).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_and_read_head() {
        let (_dir, backend) = setup(&[("Edition 9.pdf", b"%PDF-1.7 body")]);
        assert_eq!(backend.read(Path::new("Edition 9.pdf")).await.unwrap(), b"%PDF-1.7 body");
        assert_eq!(backend.read_head(Path::new("Edition 9.pdf"), 1).await.unwrap(), b"%");
        assert_eq!(backend.read_head(Path::new("Edition 9.pdf"), 100).await.unwrap(), b"%PDF-1.7 body");
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let (_dir, backend) = setup(&[]);
        let err = backend.read(Path::new("Edition 9.pdf")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        let err = backend.read_head(Path::new("Edition 9.pdf"), 1).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_dir, backend) = setup(&[]);
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.exists(Path::new("docs/../../passwd")).await.is_err());
    }
}
