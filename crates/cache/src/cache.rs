use crate::DurableHandle;
use crate::error::{ErrorKind, Result};
use editions_render::error::ErrorKind as RenderErrorKind;
use editions_render::{Cover, RendererHandle};
use editions_storage::Document;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::instrument;

/// Covers at least this long (encoded) are kept in memory only.
pub const DEFAULT_ADMISSION_THRESHOLD: usize = 2_000_000;
const KEY_PREFIX: &str = "cover::";

type Flight = Shared<BoxFuture<'static, std::result::Result<Cover, RenderErrorKind>>>;

/// Two-tier cache of rendered covers, keyed by document path.
///
/// Lookups go memory, then durable store, then renderer. Every path has at
/// most one lookup in flight: concurrent callers for the same path await the
/// same future and observe the same cover or the same failure. Failures are
/// never cached. Durable store errors are logged and otherwise ignored, so a
/// broken store degrades the cache to memory only.
///
/// Clones share all state. A "restart" is a new cache over the same durable
/// store.
#[derive(Clone)]
pub struct CoverCache {
    renderer: RendererHandle,
    durable: DurableHandle,
    admission_threshold: usize,
    memory: Arc<RwLock<HashMap<String, Cover>>>,
    inflight: Arc<Mutex<HashMap<String, Flight>>>,
}

impl CoverCache {
    pub fn new(renderer: RendererHandle, durable: DurableHandle) -> Self {
        Self {
            renderer,
            durable,
            admission_threshold: DEFAULT_ADMISSION_THRESHOLD,
            memory: Arc::default(),
            inflight: Arc::default(),
        }
    }

    /// Only covers whose encoded length is strictly below `threshold` are
    /// written to the durable store.
    pub fn with_admission_threshold(mut self, threshold: usize) -> Self {
        self.admission_threshold = threshold;
        self
    }

    /// Durable store key for the document at `path`.
    pub fn key(path: &str) -> String {
        format!("{KEY_PREFIX}{path}")
    }

    /// Memory-tier lookup; never touches the durable store or the renderer.
    pub fn peek(&self, path: &str) -> Option<Cover> {
        self.memory.read().unwrap_or_else(PoisonError::into_inner).get(path).cloned()
    }

    /// Number of paths with a lookup currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Cover for `document`, rendering it if neither tier has it.
    #[instrument(level = "debug", skip(self, document), fields(path = document.path()))]
    pub async fn get(&self, document: &Document) -> Result<Cover> {
        if let Some(cover) = self.peek(document.path()) {
            tracing::trace!("Memory hit");
            return Ok(cover);
        }
        let flight = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            // A flight may have landed between the peek and taking the lock.
            if let Some(cover) = self.peek(document.path()) {
                return Ok(cover);
            }
            match inflight.get(document.path()) {
                Some(flight) => {
                    tracing::trace!("Joining in-flight lookup");
                    flight.clone()
                },
                None => {
                    let flight = self.clone().fly(document.clone()).boxed().shared();
                    inflight.insert(document.path().to_string(), flight.clone());
                    flight
                },
            }
        };
        flight.await.map_err(|kind| exn::Exn::from(ErrorKind::Render(kind)))
    }

    async fn fly(self, document: Document) -> std::result::Result<Cover, RenderErrorKind> {
        let result = self.load_or_render(&document).await;
        // Memory is populated before the flight is forgotten, so later callers
        // never miss both.
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner).remove(document.path());
        result
    }

    async fn load_or_render(&self, document: &Document) -> std::result::Result<Cover, RenderErrorKind> {
        let key = Self::key(document.path());
        match self.durable.get(&key).await {
            Ok(Some(encoded)) => {
                tracing::debug!(store = self.durable.name(), "Durable hit");
                let cover = Cover::from(encoded);
                self.remember(document.path(), cover.clone());
                return Ok(cover);
            },
            Ok(None) => {},
            Err(e) => tracing::warn!(store = self.durable.name(), error = ?e, "Durable lookup failed; rendering"),
        }
        let cover = match self.renderer.render_cover(document).await {
            Ok(cover) => cover,
            Err(e) => {
                tracing::debug!(error = ?e, "Render failed");
                return Err((*e).clone());
            },
        };
        self.remember(document.path(), cover.clone());
        if cover.len() < self.admission_threshold {
            if let Err(e) = self.durable.put(&key, cover.as_str()).await {
                tracing::warn!(store = self.durable.name(), error = ?e, "Could not persist cover; keeping it in memory");
            }
        } else {
            tracing::debug!(len = cover.len(), threshold = self.admission_threshold, "Cover too large to persist");
        }
        Ok(cover)
    }

    fn remember(&self, path: &str, cover: Cover) {
        self.memory.write().unwrap_or_else(PoisonError::into_inner).insert(path.to_string(), cover);
    }
}
