//! HTTP storage backend.
//!
//! Talks to a dumb static file host: `HEAD` for existence, a ranged `GET`
//! for the head of a file and a plain `GET` for the whole body. The only
//! contract asked of the host is "respond with success iff the resource
//! exists"; byte ranges are optional and a host that ignores them is handled
//! by truncating the streamed body client-side.

use crate::error::{ErrorKind, Result};
use crate::{StorageBackend, path::validate as validate_path};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::header::{CACHE_CONTROL, RANGE};
use reqwest::{Client, StatusCode, Url};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// HTTP(S) storage backend rooted at a base URL (e.g. `https://example.org/docs/`).
///
/// # Examples
///
/// ```no_run
/// use editions_storage::backend::HttpBackend;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = HttpBackend::new("site", "https://example.org/docs", Duration::from_secs(30))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpBackend {
    name: String,
    base: Url,
    client: Client,
}
impl HttpBackend {
    /// Create a backend for documents underneath `base`.
    ///
    /// A trailing slash is added to the base path when missing so that
    /// document names are resolved *inside* it rather than replacing its last
    /// segment.
    pub fn new(name: impl Into<String>, base: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base).or_raise(|| ErrorKind::InvalidUrl(base.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::InvalidUrl(base.to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .or_raise(|| ErrorKind::BackendError("could not build HTTP client".to_string()))?;
        Ok(Self { name: name.into(), base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a storage path to a URL, percent-encoding each segment.
    fn url(&self, path: &Path) -> Result<Url> {
        let validated = validate_path(path)?;
        let mut encoded = Vec::new();
        for segment in validated.iter() {
            let Some(segment) = segment.to_str() else {
                exn::bail!(ErrorKind::InvalidPath(validated.clone()));
            };
            encoded.push(urlencoding::encode(segment).into_owned());
        }
        self.base.join(&encoded.join("/")).or_raise(|| ErrorKind::InvalidPath(validated.clone()))
    }

    fn status_error(status: StatusCode, path: &Path) -> ErrorKind {
        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => ErrorKind::NotFound(path.to_path_buf()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Network(format!("unexpected status {status} for {}", path.display())),
        }
    }

    async fn get(&self, path: &Path, range: Option<usize>) -> Result<reqwest::Response> {
        let url = self.url(path)?;
        let mut request = self.client.get(url).header(CACHE_CONTROL, "no-store");
        if let Some(bytes) = range {
            request = request.header(RANGE, format!("bytes=0-{}", bytes.saturating_sub(1)));
        }
        request.send().await.or_raise(|| ErrorKind::Network(format!("GET {} failed", path.display())))
    }
}

#[async_trait]
impl StorageBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "trace", skip(self), fields(backend = %self.name))]
    async fn exists(&self, path: &Path) -> Result<bool> {
        let url = self.url(path)?;
        let response = self
            .client
            .head(url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("HEAD {} failed", path.display())))?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(false),
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED => {
                exn::bail!(ErrorKind::Unsupported(format!("HEAD answered {}", response.status())))
            },
            status => exn::bail!(Self::status_error(status, path)),
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let response = self.get(path, None).await?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(Self::status_error(status, path));
        }
        let body = response.bytes().await.or_raise(|| ErrorKind::Network(format!("body of {} truncated", path.display())))?;
        Ok(body.to_vec())
    }

    #[instrument(level = "trace", skip(self), fields(backend = %self.name))]
    async fn read_head(&self, path: &Path, bytes: usize) -> Result<Vec<u8>> {
        if bytes == 0 {
            // A zero-length range cannot be expressed; fall back to a HEAD.
            return match self.exists(path).await? {
                true => Ok(Vec::new()),
                false => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            };
        }
        let mut response = self.get(path, Some(bytes)).await?;
        match response.status() {
            // 200 means the host ignored the range; 206 is a partial response.
            status if status.is_success() => {},
            // The resource exists but is shorter than the range (empty file).
            StatusCode::RANGE_NOT_SATISFIABLE => return Ok(Vec::new()),
            status => exn::bail!(Self::status_error(status, path)),
        }
        let mut buffer = Vec::with_capacity(bytes);
        while buffer.len() < bytes {
            let chunk = response
                .chunk()
                .await
                .or_raise(|| ErrorKind::Network(format!("body of {} truncated", path.display())))?;
            let Some(chunk) = chunk else { break };
            let wanted = (bytes - buffer.len()).min(chunk.len());
            buffer.extend_from_slice(&chunk[..wanted]);
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    type Handler = fn(method: &str, path: &str, range: Option<&str>) -> (u16, Vec<u8>);

    /// Minimal one-request-per-connection HTTP/1.1 server for exercising the
    /// backend against real sockets.
    async fn serve(handler: Handler) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&request).to_string();
                    let mut lines = request.lines();
                    let mut start = lines.next().unwrap_or_default().split(' ');
                    let method = start.next().unwrap_or_default().to_string();
                    let path = start.next().unwrap_or_default().to_string();
                    let range = lines
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.trim().eq_ignore_ascii_case("range"))
                        .map(|(_, value)| value.trim().to_string());
                    let (status, body) = handler(&method, &path, range.as_deref());
                    let head = format!(
                        "HTTP/1.1 {status} Test\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    if method != "HEAD" {
                        let _ = socket.write_all(&body).await;
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}/docs")
    }

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new("http", base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_urls() {
        assert!(HttpBackend::new("http", "not a url", Duration::from_secs(1)).is_err());
        assert!(HttpBackend::new("http", "ftp://example.org/docs", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_url_encodes_segments() {
        let backend = backend("https://example.org/docs");
        assert_eq!(backend.base().as_str(), "https://example.org/docs/");
        let url = backend.url(Path::new("Edition 9 (1).pdf")).unwrap();
        assert_eq!(url.as_str(), "https://example.org/docs/Edition%209%20%281%29.pdf");
        let url = backend.url(Path::new("archive/Edition 3.pdf")).unwrap();
        assert_eq!(url.as_str(), "https://example.org/docs/archive/Edition%203.pdf");
        assert!(backend.url(Path::new("../index.html")).is_err());
    }

    #[tokio::test]
    async fn test_exists_uses_head() {
        let base = serve(|method, path, _| match (method, path) {
            ("HEAD", "/docs/Edition%209.pdf") => (200, b"%PDF".to_vec()),
            _ => (404, Vec::new()),
        })
        .await;
        let backend = backend(&base);
        assert!(backend.exists(Path::new("Edition 9.pdf")).await.unwrap());
        assert!(!backend.exists(Path::new("Edition 8.pdf")).await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_rejected_by_host() {
        let base = serve(|method, _, _| match method {
            "HEAD" => (405, Vec::new()),
            _ => (200, b"%PDF".to_vec()),
        })
        .await;
        let err = backend(&base).exists(Path::new("Edition 9.pdf")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_read_head_sends_range() {
        let base = serve(|_, _, range| match range {
            Some("bytes=0-0") => (206, b"%".to_vec()),
            _ => (400, Vec::new()),
        })
        .await;
        assert_eq!(backend(&base).read_head(Path::new("Edition 9.pdf"), 1).await.unwrap(), b"%");
    }

    #[tokio::test]
    async fn test_read_head_truncates_when_range_ignored() {
        let base = serve(|_, _, _| (200, b"%PDF-1.7 with a long body".to_vec())).await;
        assert_eq!(backend(&base).read_head(Path::new("Edition 9.pdf"), 5).await.unwrap(), b"%PDF-");
    }

    #[tokio::test]
    async fn test_read_maps_statuses() {
        let base = serve(|_, path, _| match path {
            "/docs/Edition%209.pdf" => (200, b"%PDF-1.7".to_vec()),
            "/docs/secret.pdf" => (403, Vec::new()),
            _ => (404, Vec::new()),
        })
        .await;
        let backend = backend(&base);
        assert_eq!(backend.read(Path::new("Edition 9.pdf")).await.unwrap(), b"%PDF-1.7");
        let err = backend.read(Path::new("secret.pdf")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        let err = backend.read(Path::new("Edition 8.pdf")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }
}
