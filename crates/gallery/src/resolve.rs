//! Working out which edition files exist.

use crate::exclude::ExclusionRule;
use editions_storage::DocumentStore;
use std::fmt;
use tracing::instrument;

/// Edition numbers probed for when there is no usable manifest, in order.
pub const DEFAULT_CANDIDATES: [u32; 6] = [9, 8, 7, 6, 5, 3];
pub const DEFAULT_MANIFEST: &str = "index.json";

/// Where a [`Discovery`] got its file list from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Manifest,
    Probe,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest => f.write_str("manifest"),
            Self::Probe => f.write_str("probe"),
        }
    }
}

/// Outcome of edition discovery.
///
/// `discovered` tells "no editions exist" (true, empty) apart from "not
/// looked yet" (false).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub files: Vec<String>,
    pub discovered: bool,
    pub source: Source,
}

impl Discovery {
    /// Discovery that has not happened yet.
    pub fn pending() -> Self {
        Self { files: Vec::new(), discovered: false, source: Source::Probe }
    }
}

/// Filenames tried for edition `n`, most canonical first.
///
/// Covers the ways the files have historically been uploaded: as-is, with a
/// trailing underscore, as a browser's duplicate download (one or two spaces
/// before the `(1)`), and with an upper-case extension.
pub fn variants(n: u32) -> [String; 5] {
    [
        format!("Edition {n}.pdf"),
        format!("Edition {n}_.pdf"),
        format!("Edition {n} (1).pdf"),
        format!("Edition {n}  (1).pdf"),
        format!("Edition {n}.PDF"),
    ]
}

/// Finds the edition files on the document store.
///
/// A manifest, when present and non-empty after filtering, is authoritative.
/// Otherwise each candidate edition number is probed for in turn.
#[derive(Clone)]
pub struct Resolver {
    store: DocumentStore,
    manifest: Option<String>,
    candidates: Vec<u32>,
    exclusions: ExclusionRule,
}

impl Resolver {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            manifest: Some(DEFAULT_MANIFEST.to_string()),
            candidates: DEFAULT_CANDIDATES.to_vec(),
            exclusions: ExclusionRule::default(),
        }
    }

    /// Name of the manifest resource, or `None` to always probe.
    pub fn with_manifest(mut self, manifest: Option<String>) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_candidates(mut self, candidates: impl IntoIterator<Item = u32>) -> Self {
        self.candidates = candidates.into_iter().collect();
        self
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionRule) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn exclusions(&self) -> &ExclusionRule {
        &self.exclusions
    }

    /// Discover the edition files. Never fails; the worst case is an empty
    /// (but discovered) list.
    #[instrument(level = "debug", skip(self), fields(prefix = self.store.prefix()))]
    pub async fn resolve(&self) -> Discovery {
        if let Some(files) = self.from_manifest().await {
            tracing::info!(count = files.len(), "Discovered editions from manifest");
            return Discovery { files, discovered: true, source: Source::Manifest };
        }
        let files = self.probe().await;
        tracing::info!(count = files.len(), "Discovered editions by probing");
        Discovery { files, discovered: true, source: Source::Probe }
    }

    async fn from_manifest(&self) -> Option<Vec<String>> {
        let name = self.manifest.as_deref()?;
        let manifest = self.store.manifest(name).await?;
        let Some(entries) = manifest.as_array() else {
            tracing::debug!(manifest = name, "Manifest is not a JSON array; probing instead");
            return None;
        };
        let files: Vec<String> = entries
            .iter()
            .filter_map(serde_json::Value::as_str)
            .filter(|file| file.to_ascii_lowercase().ends_with(".pdf"))
            .filter(|file| !self.exclusions.is_excluded(file))
            .map(str::to_string)
            .collect();
        if files.is_empty() {
            tracing::debug!(manifest = name, "Manifest lists no usable editions; probing instead");
            return None;
        }
        Some(files)
    }

    async fn probe(&self) -> Vec<String> {
        let mut files = Vec::new();
        for &n in &self.candidates {
            let mut found = None;
            for variant in variants(n) {
                if self.store.exists(&variant).await {
                    found = Some(variant);
                    break;
                }
            }
            match found {
                Some(file) if self.exclusions.is_excluded(&file) => {
                    tracing::debug!(%file, "Skipping excluded edition");
                },
                Some(file) => {
                    tracing::debug!(%file, "Found edition");
                    files.push(file);
                },
                None => tracing::debug!(edition = n, "No file for edition"),
            }
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use editions_storage::backend::{MockBackend, Requests};
    use std::sync::Arc;

    fn resolver(backend: MockBackend) -> (Arc<MockBackend>, Resolver) {
        let backend = Arc::new(backend);
        let store = DocumentStore::new(backend.clone(), "/docs");
        (backend, Resolver::new(store))
    }

    fn pdfs(files: &[&str]) -> MockBackend {
        MockBackend::with_files(files.iter().map(|file| (*file, Vec::from(*b"%PDF-1.7"))))
    }

    fn manifest(json: &str, files: &[&str]) -> MockBackend {
        let mut entries = vec![("index.json".to_string(), json.as_bytes().to_vec())];
        entries.extend(files.iter().map(|file| (file.to_string(), Vec::from(*b"%PDF-1.7"))));
        MockBackend::with_files(entries)
    }

    #[test]
    fn test_variants() {
        assert_eq!(
            variants(7),
            ["Edition 7.pdf", "Edition 7_.pdf", "Edition 7 (1).pdf", "Edition 7  (1).pdf", "Edition 7.PDF"]
        );
    }

    #[tokio::test]
    async fn test_manifest_is_authoritative() {
        let (backend, resolver) = resolver(manifest(r#"["Edition 9.pdf", "Edition 4.pdf", "notes.txt"]"#, &[]));
        let discovery = resolver.resolve().await;
        let expected = Discovery { files: vec!["Edition 9.pdf".to_string()], discovered: true, source: Source::Manifest };
        assert_eq!(discovery, expected);
        // Nothing is probed when the manifest is usable.
        assert_eq!(backend.requests().exists, 0);
    }

    #[tokio::test]
    async fn test_manifest_keeps_order_and_upper_case_extensions() {
        let json = r#"["Edition 3.pdf", "Edition 10.PDF", 42, null, "EDITION 4 (1).pdf"]"#;
        let (_backend, resolver) = resolver(manifest(json, &[]));
        let discovery = resolver.resolve().await;
        assert_eq!(discovery.files, ["Edition 3.pdf", "Edition 10.PDF"]);
    }

    #[rstest::rstest]
    #[case::not_an_array(r#"{"files": ["Edition 9.pdf"]}"#)]
    #[case::malformed(r#"["Edition 9.pdf""#)]
    #[case::nothing_usable(r#"["Edition 4.pdf", "README.md"]"#)]
    #[case::empty("[]")]
    #[tokio::test]
    async fn test_unusable_manifest_falls_back_to_probing(#[case] json: &str) {
        let (_backend, resolver) = resolver(manifest(json, &["Edition 8.pdf"]));
        let discovery = resolver.resolve().await;
        assert_eq!(discovery.source, Source::Probe);
        assert_eq!(discovery.files, ["Edition 8.pdf"]);
    }

    #[tokio::test]
    async fn test_probe_finds_variants() {
        let (_backend, resolver) = resolver(pdfs(&["Edition 7_.pdf", "Edition 5.pdf"]));
        let discovery = resolver.resolve().await;
        assert_eq!(discovery.source, Source::Probe);
        assert!(discovery.discovered);
        assert_eq!(discovery.files, ["Edition 7_.pdf", "Edition 5.pdf"]);
        let ids: Vec<u32> = discovery.files.iter().map(|f| crate::edition::parse_id(f)).collect();
        assert_eq!(ids, [7, 5]);
    }

    #[tokio::test]
    async fn test_probe_prefers_earlier_variants() {
        let (_backend, resolver) = resolver(pdfs(&["Edition 9  (1).pdf", "Edition 9_.pdf", "Edition 6.PDF"]));
        assert_eq!(resolver.resolve().await.files, ["Edition 9_.pdf", "Edition 6.PDF"]);
    }

    #[tokio::test]
    async fn test_probe_excludes_edition_four() {
        let (_backend, resolver) = resolver(pdfs(&["Edition 4.pdf", "Edition 5.pdf", "Edition 42.pdf"]));
        let resolver = resolver.with_candidates([42, 5, 4]);
        assert_eq!(resolver.resolve().await.files, ["Edition 42.pdf", "Edition 5.pdf"]);
    }

    #[tokio::test]
    async fn test_probe_falls_back_when_head_rejected() {
        let (backend, resolver) = resolver(pdfs(&["Edition 3.pdf"]).rejecting_exists());
        let resolver = resolver.with_manifest(None).with_candidates([3]);
        assert_eq!(resolver.resolve().await.files, ["Edition 3.pdf"]);
        assert_eq!(backend.requests(), Requests { exists: 1, read: 0, read_head: 1 });
    }

    #[tokio::test]
    async fn test_nothing_found_is_still_discovered() {
        let (backend, resolver) = resolver(MockBackend::default());
        let discovery = resolver.resolve().await;
        assert_eq!(discovery, Discovery { files: vec![], discovered: true, source: Source::Probe });
        // Every variant of every candidate was tried.
        assert_eq!(backend.requests().exists, DEFAULT_CANDIDATES.len() * 5);
        assert!(!Discovery::pending().discovered);
    }
}
