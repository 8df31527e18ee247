//! Cover thumbnails for edition PDFs.
//!
//! A [`CoverRenderer`] fetches a document from the [`DocumentStore`],
//! rasterizes its first page through a [`PdfEngine`] on a blocking thread and
//! encodes the result as a JPEG `data:` URI ([`Cover`]). PDFium is the
//! production engine; [`MockEngine`] stands in for it in tests.
//!
//! [`DocumentStore`]: editions_storage::DocumentStore

mod cover;
mod engine;
pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(feature = "pdfium")]
mod pdfium;
mod renderer;

pub use crate::cover::Cover;
pub use crate::engine::{PageSize, PdfDocument, PdfEngine};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockEngine;
#[cfg(feature = "pdfium")]
pub use crate::pdfium::PdfiumEngine;
pub use crate::renderer::{CoverRenderer, RenderCover, RenderSettings};
use std::sync::Arc;

pub type EngineHandle = Arc<dyn PdfEngine + Send + Sync>;
pub type RendererHandle = Arc<dyn RenderCover + Send + Sync>;
