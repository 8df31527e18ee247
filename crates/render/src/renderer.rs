use crate::cover::Cover;
use crate::engine::{PageSize, PdfDocument};
use crate::error::{ErrorKind, Result};
use crate::EngineHandle;
use async_trait::async_trait;
use editions_storage::{Document, DocumentStore};
use exn::ResultExt;
use tracing::instrument;

/// Tuning for cover rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    /// Requested thumbnail width in pixels.
    pub target_width: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
    pub min_scale: f32,
    pub max_scale: f32,
}
impl Default for RenderSettings {
    fn default() -> Self {
        Self { target_width: 1200, quality: 85, min_scale: 0.12, max_scale: 3.0 }
    }
}

impl RenderSettings {
    /// Scale factor turning a page `native_width` points wide into roughly
    /// `target_width` pixels, clamped to `[min_scale, max_scale]`.
    ///
    /// Degenerate pages (zero, negative or non-finite width) never produce a
    /// non-finite scale.
    pub fn scale(&self, target_width: u32, native_width: f32) -> f32 {
        let ratio = target_width as f32 / native_width;
        if ratio.is_nan() {
            return self.max_scale;
        }
        ratio.clamp(self.min_scale, self.max_scale)
    }

    /// Pixel dimensions of `page` rendered at `scale`, at least 1x1.
    pub fn viewport(page: PageSize, scale: f32) -> (u32, u32) {
        let dimension = |points: f32| {
            let pixels = (points * scale).floor();
            match pixels.is_finite() && pixels >= 1.0 {
                true => pixels as u32,
                false => 1,
            }
        };
        (dimension(page.width), dimension(page.height))
    }
}

/// Anything that can turn a [`Document`] into a [`Cover`].
///
/// The cover cache depends on this rather than on [`CoverRenderer`] so tests
/// can count and stall renders.
#[async_trait]
pub trait RenderCover: Send + Sync {
    async fn render_cover(&self, document: &Document) -> Result<Cover>;
}

/// Fetches a document and rasterizes its first page into a JPEG cover.
#[derive(Clone)]
pub struct CoverRenderer {
    store: DocumentStore,
    engine: EngineHandle,
    settings: RenderSettings,
}
impl CoverRenderer {
    pub fn new(store: DocumentStore, engine: EngineHandle) -> Self {
        Self { store, engine, settings: RenderSettings::default() }
    }

    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render the first page of `document` roughly `target_width` pixels wide.
    #[instrument(level = "debug", skip(self, document), fields(path = document.path(), engine = self.engine.name()))]
    pub async fn render(&self, document: &Document, target_width: u32) -> Result<Cover> {
        let bytes = self.store.read(document.file()).await.or_raise(|| ErrorKind::Fetch)?;
        tracing::trace!(bytes = bytes.len(), "Fetched document");
        let engine = self.engine.clone();
        let settings = self.settings;
        let image = tokio::task::spawn_blocking(move || {
            engine.with_document(&bytes, &mut |pdf: &dyn PdfDocument| {
                if pdf.page_count() == 0 {
                    exn::bail!(ErrorKind::MissingPage);
                }
                let page = pdf.page_size(0)?;
                let scale = settings.scale(target_width, page.width);
                let (width, height) = RenderSettings::viewport(page, scale);
                tracing::trace!(?page, scale, width, height, "Rasterizing first page");
                pdf.rasterize(0, width, height)
            })
        })
        .await
        .or_raise(|| ErrorKind::Worker)??;
        let cover = Cover::encode_jpeg(image, settings.quality)?;
        tracing::debug!(len = cover.len(), "Rendered cover");
        Ok(cover)
    }
}

#[async_trait]
impl RenderCover for CoverRenderer {
    async fn render_cover(&self, document: &Document) -> Result<Cover> {
        self.render(document, self.settings.target_width).await
    }
}
