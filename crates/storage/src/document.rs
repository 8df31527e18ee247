/// A document on the store, addressed both by its filename and by the
/// canonical URL-encoded path the presentation layer links to.
///
/// The canonical path (`/docs/Edition%209.pdf`) doubles as the cover cache
/// key, so two documents are the same document iff their paths are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Document {
    file: String,
    path: String,
}

impl Document {
    /// Build the reference for `file` underneath the URL `prefix`.
    ///
    /// ```
    /// use editions_storage::Document;
    ///
    /// let doc = Document::new("/docs/", "Edition 9.pdf");
    /// assert_eq!(doc.path(), "/docs/Edition%209.pdf");
    /// assert_eq!(doc.file(), "Edition 9.pdf");
    /// ```
    pub fn new(prefix: &str, file: impl Into<String>) -> Self {
        let file = file.into();
        let path = format!("{}/{}", prefix.trim_end_matches('/'), urlencoding::encode(&file));
        Self { file, path }
    }

    /// Filename relative to the store root.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Canonical URL-encoded path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Link for the full-screen reader, opening on the first page fitted to
    /// the viewport.
    pub fn viewer_link(&self) -> String {
        format!("{}#zoom=page-fit&view=Fit&page=1", self.path)
    }

    pub fn download_link(&self) -> &str {
        &self.path
    }
}
