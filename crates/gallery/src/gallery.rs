use crate::edition::{DEFAULT_PUBLICATION, Edition, editions};
use crate::resolve::Resolver;
use async_stream::stream;
use editions_cache::CoverCache;
use editions_render::Cover;
use editions_storage::Document;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;

/// Cover requests in flight at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Progress events emitted by [`Gallery::run`] and [`Gallery::refresh`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once, from [`Gallery::run`] only.
/// 2. [`Discovered`](Self::Discovered): exactly once, with the sorted
///    editions. No cover is requested before it.
/// 3. [`CoverRequested`](Self::CoverRequested) once per edition, in edition
///    order, each followed at some later point by exactly one of
///    [`CoverReady`](Self::CoverReady) or [`CoverFailed`](Self::CoverFailed).
///    Completions arrive in any order.
/// 4. [`Complete`](Self::Complete): exactly once, last.
#[derive(Debug, Clone, PartialEq)]
pub enum GalleryEvent {
    Started,
    Discovered(Vec<Edition>),
    /// The cover for the document at this path has been asked for.
    CoverRequested(String),
    CoverReady { path: String, cover: Cover },
    /// The cover could not be produced; the edition keeps its placeholder.
    CoverFailed { path: String, reason: String },
    Complete,
}

/// Discovers the editions and fetches a cover for each.
///
/// Failures are per edition: a cover that cannot be produced is logged and
/// reported as [`GalleryEvent::CoverFailed`], never ending the stream.
#[derive(Clone)]
pub struct Gallery {
    resolver: Resolver,
    cache: CoverCache,
    publication: String,
    concurrency: usize,
}

impl Gallery {
    pub fn new(resolver: Resolver, cache: CoverCache) -> Self {
        Self { resolver, cache, publication: DEFAULT_PUBLICATION.to_string(), concurrency: DEFAULT_CONCURRENCY }
    }

    pub fn with_publication(mut self, publication: impl Into<String>) -> Self {
        self.publication = publication.into();
        self
    }

    /// Maximum cover requests in flight at once (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &CoverCache {
        &self.cache
    }

    /// Document backing `edition`.
    pub fn document(&self, edition: &Edition) -> Document {
        self.resolver.store().document(&edition.file)
    }

    /// Discover the editions, then stream their covers.
    pub fn run(&self) -> impl Stream<Item = GalleryEvent> + '_ {
        // `rustfmt` does not format macro-specific syntax such as
        // `for await` even using the parentheses trick.
        stream! {
            yield GalleryEvent::Started;
            let discovery = self.resolver.resolve().await;
            let editions = editions(discovery.files, &self.publication);
            yield GalleryEvent::Discovered(editions.clone());
            for await event in self.covers(editions) {
                yield event;
            }
            yield GalleryEvent::Complete;
        }
    }

    /// Re-sort for a changed set of files and re-request their covers.
    ///
    /// Covers already in the cache come straight back without rendering.
    pub fn refresh(&self, files: Vec<String>) -> impl Stream<Item = GalleryEvent> + '_ {
        stream! {
            let exclusions = self.resolver.exclusions();
            let files = files.into_iter().filter(|file| !exclusions.is_excluded(file));
            let editions = editions(files, &self.publication);
            yield GalleryEvent::Discovered(editions.clone());
            for await event in self.covers(editions) {
                yield event;
            }
            yield GalleryEvent::Complete;
        }
    }

    fn covers(&self, editions: Vec<Edition>) -> impl Stream<Item = GalleryEvent> + '_ {
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            let mut queue: VecDeque<Document> = editions.iter().map(|edition| self.document(edition)).collect();
            let request = |document: Document| async move {
                let result = self.cache.get(&document).await;
                (document, result)
            };
            let mut processing = FuturesUnordered::new();
            while processing.len() < self.concurrency {
                let Some(document) = queue.pop_front() else { break };
                yield GalleryEvent::CoverRequested(document.path().to_string());
                processing.push(request(document));
            }
            while let Some((document, result)) = processing.next().await {
                let path = document.path().to_string();
                yield match result {
                    Ok(cover) => GalleryEvent::CoverReady { path, cover },
                    Err(e) => {
                        tracing::warn!(%path, error = ?e, "Cover unavailable; keeping placeholder");
                        GalleryEvent::CoverFailed { path, reason: e.to_string() }
                    },
                };
                // Promote the next edition in list order.
                if let Some(document) = queue.pop_front() {
                    yield GalleryEvent::CoverRequested(document.path().to_string());
                    processing.push(request(document));
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use editions_cache::MemoryStore;
    use editions_render::{CoverRenderer, MockEngine};
    use editions_storage::DocumentStore;
    use editions_storage::backend::MockBackend;
    use async_trait::async_trait;
    use editions_render::RenderCover;
    use std::sync::Arc;
    use tokio::sync::Notify;

    struct Fixture {
        engine: Arc<MockEngine>,
        gallery: Gallery,
    }

    fn fixture(files: Vec<(&str, Vec<u8>)>) -> Fixture {
        let store = DocumentStore::new(Arc::new(MockBackend::with_files(files)), "/docs");
        let engine = Arc::new(MockEngine::default());
        let renderer = CoverRenderer::new(store.clone(), engine.clone());
        let cache = CoverCache::new(Arc::new(renderer), Arc::new(MemoryStore::new()));
        Fixture { engine, gallery: Gallery::new(Resolver::new(store), cache) }
    }

    fn pdf() -> Vec<u8> {
        MockEngine::pdf(600.0, 800.0)
    }

    async fn collect(stream: impl Stream<Item = GalleryEvent>) -> Vec<GalleryEvent> {
        stream.collect().await
    }

    fn ready(events: &[GalleryEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|event| match event {
                GalleryEvent::CoverReady { path, .. } => Some(path.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_run_orders_events() {
        let fixture = fixture(vec![("Edition 5.pdf", pdf()), ("Edition 7_.pdf", pdf())]);
        let events = collect(fixture.gallery.run()).await;
        assert_eq!(events.first(), Some(&GalleryEvent::Started));
        let GalleryEvent::Discovered(editions) = &events[1] else {
            panic!("expected discovery second, got {:?}", events[1]);
        };
        let ids: Vec<u32> = editions.iter().map(|e| e.id).collect();
        assert_eq!(ids, [7, 5]);
        let requested: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                GalleryEvent::CoverRequested(path) => Some(path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(requested, ["/docs/Edition%207_.pdf", "/docs/Edition%205.pdf"]);
        let mut ready = ready(&events);
        ready.sort();
        assert_eq!(ready, ["/docs/Edition%205.pdf", "/docs/Edition%207_.pdf"]);
        assert_eq!(events.last(), Some(&GalleryEvent::Complete));
        assert_eq!(events.len(), 1 + 1 + 2 + 2 + 1);
    }

    /// Renders instantly, except for `Edition 9.pdf` which waits for `gate`.
    struct GatedRenderer {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl RenderCover for GatedRenderer {
        async fn render_cover(&self, document: &Document) -> editions_render::error::Result<Cover> {
            if document.file() == "Edition 9.pdf" {
                self.gate.notified().await;
            }
            Ok(Cover::from(format!("data:image/jpeg;base64,{}", document.file())))
        }
    }

    #[tokio::test]
    async fn test_covers_surface_as_they_complete() {
        let store = DocumentStore::new(
            Arc::new(MockBackend::with_files([("Edition 9.pdf", pdf()), ("Edition 8.pdf", pdf())])),
            "/docs",
        );
        let gate = Arc::new(Notify::new());
        let renderer = Arc::new(GatedRenderer { gate: gate.clone() });
        let gallery = Gallery::new(Resolver::new(store), CoverCache::new(renderer, Arc::new(MemoryStore::new())));

        let events = gallery.run();
        futures::pin_mut!(events);
        let mut order = Vec::new();
        while let Some(event) = events.next().await {
            if let GalleryEvent::CoverReady { path, .. } = event {
                // Edition 9 was requested first but can only finish once 8 has been seen.
                if path == "/docs/Edition%208.pdf" {
                    gate.notify_one();
                }
                order.push(path);
            }
        }
        assert_eq!(order, ["/docs/Edition%208.pdf", "/docs/Edition%209.pdf"]);
    }

    #[tokio::test]
    async fn test_run_with_nothing_to_show() {
        let fixture = fixture(vec![]);
        let events = collect(fixture.gallery.run()).await;
        assert_eq!(events, [GalleryEvent::Started, GalleryEvent::Discovered(vec![]), GalleryEvent::Complete]);
    }

    #[tokio::test]
    async fn test_failed_cover_does_not_block_others() {
        let fixture = fixture(vec![
            ("Edition 9.pdf", b"<html>404</html>".to_vec()),
            ("Edition 8.pdf", pdf()),
            ("Edition 3.pdf", pdf()),
        ]);
        let events = collect(fixture.gallery.run()).await;
        let failed: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                GalleryEvent::CoverFailed { path, .. } => Some(path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(failed, ["/docs/Edition%209.pdf"]);
        assert_eq!(ready(&events).len(), 2);
        assert_eq!(events.last(), Some(&GalleryEvent::Complete));
    }

    #[tokio::test]
    async fn test_failed_cover_is_retried_on_refresh() {
        let fixture = fixture(vec![("Edition 9.pdf", b"<html>404</html>".to_vec()), ("Edition 8.pdf", pdf())]);
        collect(fixture.gallery.run()).await;
        assert_eq!(fixture.engine.opened(), 1);

        let files = vec!["Edition 9.pdf".to_string(), "Edition 8.pdf".to_string()];
        let events = collect(fixture.gallery.refresh(files)).await;
        // Edition 8 is a cache hit; edition 9 is attempted again and fails again.
        assert_eq!(fixture.engine.opened(), 1);
        assert_eq!(ready(&events), ["/docs/Edition%208.pdf"]);
        let retried = |e: &GalleryEvent| matches!(e, GalleryEvent::CoverFailed { path, .. } if path == "/docs/Edition%209.pdf");
        assert!(events.iter().any(retried));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let files: Vec<_> = [9, 8, 7, 6, 5, 3].iter().map(|n| (format!("Edition {n}.pdf"), pdf())).collect();
        let files: Vec<(&str, Vec<u8>)> = files.iter().map(|(f, d)| (f.as_str(), d.clone())).collect();
        let fixture = fixture(files);
        let gallery = fixture.gallery.with_concurrency(2);
        let events = collect(gallery.run()).await;
        let mut outstanding = 0usize;
        let mut peak = 0usize;
        for event in &events {
            match event {
                GalleryEvent::CoverRequested(_) => outstanding += 1,
                GalleryEvent::CoverReady { .. } | GalleryEvent::CoverFailed { .. } => outstanding -= 1,
                _ => {},
            }
            peak = peak.max(outstanding);
        }
        assert_eq!(peak, 2);
        assert_eq!(outstanding, 0);
        assert_eq!(ready(&events).len(), 6);
    }

    #[tokio::test]
    async fn test_refresh_reuses_cached_covers() {
        let fixture = fixture(vec![("Edition 9.pdf", pdf()), ("Edition 8.pdf", pdf())]);
        collect(fixture.gallery.run()).await;
        assert_eq!(fixture.engine.opened(), 2);

        let files = vec!["Edition 8.pdf".to_string(), "Edition 9.pdf".to_string(), "Edition 4.pdf".to_string()];
        let events = collect(fixture.gallery.refresh(files)).await;
        let GalleryEvent::Discovered(editions) = &events[0] else {
            panic!("expected discovery first, got {:?}", events[0]);
        };
        let files: Vec<&str> = editions.iter().map(|e| e.file.as_str()).collect();
        assert_eq!(files, ["Edition 9.pdf", "Edition 8.pdf"]);
        assert_eq!(ready(&events).len(), 2);
        assert_eq!(fixture.engine.opened(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_runs_render_once() {
        let fixture = fixture(vec![("Edition 9.pdf", pdf())]);
        let (a, b) = tokio::join!(collect(fixture.gallery.run()), collect(fixture.gallery.run()));
        assert_eq!(ready(&a), ready(&b));
        assert_eq!(fixture.engine.opened(), 1);
    }
}
