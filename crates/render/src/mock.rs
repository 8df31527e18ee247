//! Scriptable PDF engine for testing.

use crate::engine::{PageSize, PdfDocument, PdfEngine};
use crate::error::{ErrorKind, Result};
use image::{Rgba, RgbaImage};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const MAGIC: &str = "%PDF-mock";

/// PDF engine that understands a tiny textual stand-in for PDF files.
///
/// Documents are built with [`MockEngine::pdf`] and friends; anything else
/// fails to open. Every open and release is counted and every rasterized
/// viewport recorded, so tests can check both the maths and that documents
/// are always released.
#[derive(Default)]
pub struct MockEngine {
    opened: AtomicUsize,
    released: AtomicUsize,
    viewports: Mutex<Vec<(u32, u32)>>,
}

impl MockEngine {
    /// A one-page document with the given page size in points.
    pub fn pdf(width: f32, height: f32) -> Vec<u8> {
        format!("{MAGIC} pages=1 size={width}x{height}").into_bytes()
    }

    /// A well-formed document without any pages.
    pub fn empty_pdf() -> Vec<u8> {
        format!("{MAGIC} pages=0").into_bytes()
    }

    /// A document that opens but fails to rasterize.
    pub fn unrasterizable_pdf(width: f32, height: f32) -> Vec<u8> {
        format!("{MAGIC} pages=1 size={width}x{height} broken").into_bytes()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn viewports(&self) -> Vec<(u32, u32)> {
        self.viewports.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn parse(bytes: &[u8]) -> Option<(u16, PageSize, bool)> {
        let text = std::str::from_utf8(bytes).ok()?.strip_prefix(MAGIC)?;
        let (mut pages, mut size, mut broken) = (None, PageSize { width: 0.0, height: 0.0 }, false);
        for token in text.split_whitespace() {
            match token.split_once('=') {
                Some(("pages", n)) => pages = n.parse().ok(),
                Some(("size", wh)) => {
                    let (w, h) = wh.split_once('x')?;
                    size = PageSize { width: w.parse().ok()?, height: h.parse().ok()? };
                },
                None if token == "broken" => broken = true,
                _ => return None,
            }
        }
        Some((pages?, size, broken))
    }
}

impl PdfEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn with_document(
        &self,
        bytes: &[u8],
        work: &mut dyn FnMut(&dyn PdfDocument) -> Result<RgbaImage>,
    ) -> Result<RgbaImage> {
        let Some((pages, size, broken)) = Self::parse(bytes) else {
            exn::bail!(ErrorKind::Open);
        };
        self.opened.fetch_add(1, Ordering::SeqCst);
        let document = MockDocument { engine: self, pages, size, broken };
        work(&document)
    }
}

struct MockDocument<'a> {
    engine: &'a MockEngine,
    pages: u16,
    size: PageSize,
    broken: bool,
}

impl PdfDocument for MockDocument<'_> {
    fn page_count(&self) -> u16 {
        self.pages
    }

    fn page_size(&self, index: u16) -> Result<PageSize> {
        match index < self.pages {
            true => Ok(self.size),
            false => exn::bail!(ErrorKind::MissingPage),
        }
    }

    fn rasterize(&self, index: u16, width: u32, height: u32) -> Result<RgbaImage> {
        if index >= self.pages {
            exn::bail!(ErrorKind::MissingPage);
        }
        if self.broken {
            exn::bail!(ErrorKind::Rasterize);
        }
        if let Ok(mut viewports) = self.engine.viewports.lock() {
            viewports.push((width, height));
        }
        Ok(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
    }
}

impl Drop for MockDocument<'_> {
    fn drop(&mut self) {
        self.engine.released.fetch_add(1, Ordering::SeqCst);
    }
}
