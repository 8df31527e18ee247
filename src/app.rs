//! Wiring configuration into the gallery's components.

use crate::error::{ErrorKind, Result};
use editions_cache::{CoverCache, DurableHandle, MemoryStore, SqliteStore};
use editions_config::{Config, StoreLocation};
use editions_gallery::{ExclusionRule, Gallery, Resolver};
use editions_render::{CoverRenderer, EngineHandle, PdfiumEngine, RenderSettings};
use editions_storage::backend::{HttpBackend, LocalBackend};
use editions_storage::{BackendHandle, DocumentStore};
use exn::ResultExt;
use std::sync::Arc;

pub struct App {
    pub config: Config,
    pub store: DocumentStore,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let backend: BackendHandle = match config.store.location() {
            StoreLocation::Http(base) => {
                let backend = HttpBackend::new("http", &base, config.store.timeout()).or_raise(|| ErrorKind::Store)?;
                Arc::new(backend)
            },
            StoreLocation::Directory(dir) => {
                let dir = std::path::absolute(&dir).or_raise(|| ErrorKind::Store)?;
                Arc::new(LocalBackend::new("local", dir).or_raise(|| ErrorKind::Store)?)
            },
        };
        tracing::debug!(backend = backend.name(), prefix = %config.store.prefix, "Document store ready");
        let store = DocumentStore::new(backend, config.store.prefix.clone());
        Ok(Self { config, store })
    }

    pub fn resolver(&self) -> Result<Resolver> {
        let discovery = &self.config.discovery;
        let exclusions = ExclusionRule::new(&discovery.exclude).or_raise(|| ErrorKind::Exclusions)?;
        let manifest = Some(self.config.store.manifest.trim().to_string()).filter(|name| !name.is_empty());
        Ok(Resolver::new(self.store.clone())
            .with_manifest(manifest)
            .with_candidates(discovery.candidates.iter().copied())
            .with_exclusions(exclusions))
    }

    /// The durable cover store, falling back to process memory when the
    /// database is disabled or cannot be opened.
    pub async fn durable(&self) -> (DurableHandle, Option<SqliteStore>) {
        let Some(path) = self.config.cache.database_path() else {
            tracing::debug!("Durable cache disabled; covers last for this run only");
            return (Arc::new(MemoryStore::new()), None);
        };
        match SqliteStore::connect(&path).await {
            Ok(store) => {
                tracing::debug!(path = %path.display(), "Opened cover database");
                (Arc::new(store.clone()), Some(store))
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = ?e, "Cover database unavailable; caching in memory only");
                (Arc::new(MemoryStore::new()), None)
            },
        }
    }

    pub fn gallery(&self, durable: DurableHandle) -> Result<Gallery> {
        let covers = &self.config.covers;
        let engine: EngineHandle =
            Arc::new(PdfiumEngine::discover(covers.pdfium_library.as_deref()).or_raise(|| ErrorKind::Engine)?);
        let renderer = CoverRenderer::new(self.store.clone(), engine).with_settings(RenderSettings {
            target_width: covers.target_width,
            quality: covers.quality,
            min_scale: covers.min_scale,
            max_scale: covers.max_scale,
        });
        let cache = CoverCache::new(Arc::new(renderer), durable).with_admission_threshold(covers.admission_threshold);
        Ok(Gallery::new(self.resolver()?, cache)
            .with_publication(self.config.discovery.publication.clone())
            .with_concurrency(covers.concurrency))
    }
}
