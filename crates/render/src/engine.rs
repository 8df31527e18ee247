//! The seam between cover rendering and the PDF library doing the work.

use crate::error::Result;
use image::RgbaImage;

/// Size of a page at scale 1.0, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// An open PDF document.
///
/// Pages are zero-indexed. Implementations release every native resource
/// when dropped; callers never close a document explicitly.
pub trait PdfDocument {
    fn page_count(&self) -> u16;

    fn page_size(&self, index: u16) -> Result<PageSize>;

    /// Rasterize page `index` into a `width` x `height` bitmap with an opaque
    /// white background.
    fn rasterize(&self, index: u16, width: u32, height: u32) -> Result<RgbaImage>;
}

/// A PDF library able to open documents from memory.
///
/// All methods are blocking and are expected to run on a blocking thread.
pub trait PdfEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Open `bytes` as a PDF and lend the document to `work`.
    ///
    /// The document only lives for the duration of the call and is released
    /// before this returns, whether `work` succeeded or not.
    fn with_document(&self, bytes: &[u8], work: &mut dyn FnMut(&dyn PdfDocument) -> Result<RgbaImage>)
    -> Result<RgbaImage>;
}
