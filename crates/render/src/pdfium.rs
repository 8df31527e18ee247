//! PDFium-backed [`PdfEngine`].

use crate::engine::{PageSize, PdfDocument, PdfEngine};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// PDFium keeps process-wide state and must not be driven from two threads
/// at once.
static PDFIUM: Mutex<()> = Mutex::new(());

/// Location of the PDFium dynamic library.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Library {
    /// A library file found on disk.
    File(PathBuf),
    /// Whatever the platform's dynamic loader resolves.
    System,
}

pub struct PdfiumEngine {
    library: Library,
    pdfium: Pdfium,
}
impl PdfiumEngine {
    /// Locate PDFium and bind it for the lifetime of the engine.
    ///
    /// Search order:
    /// 1. `explicit`, when given (an error if it cannot be bound)
    /// 2. `lib/` in the current working directory
    /// 3. `lib/` next to the executable, and the executable's own directory
    /// 4. The system library
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let path = match path.is_dir() {
                true => PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(path)),
                false => path.to_path_buf(),
            };
            return Self::bind(Library::File(path));
        }
        for path in Self::search_paths() {
            if !path.is_file() {
                continue;
            }
            match Self::bind(Library::File(path)) {
                Ok(engine) => return Ok(engine),
                Err(e) => tracing::debug!(error = ?e, "Skipping unusable PDFium candidate"),
            }
        }
        Self::bind(Library::System)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(&cwd.join("lib"))));
        }
        if let Ok(exe) = std::env::current_exe()
            && let Some(parent) = exe.parent()
        {
            paths.push(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(&parent.join("lib"))));
            paths.push(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(parent)));
        }
        paths
    }

    fn bind(library: Library) -> Result<Self> {
        let _guard = lock();
        let bindings = match &library {
            Library::File(path) => Pdfium::bind_to_library(path)
                .or_raise(|| ErrorKind::EngineUnavailable(format!("cannot bind {}", path.display())))?,
            Library::System => Pdfium::bind_to_system_library()
                .or_raise(|| ErrorKind::EngineUnavailable("no system PDFium library".to_string()))?,
        };
        tracing::debug!(?library, "Bound PDFium");
        Ok(Self { library, pdfium: Pdfium::new(bindings) })
    }
}

fn lock() -> MutexGuard<'static, ()> {
    PDFIUM.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PdfEngine for PdfiumEngine {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn with_document(
        &self,
        bytes: &[u8],
        work: &mut dyn FnMut(&dyn PdfDocument) -> Result<RgbaImage>,
    ) -> Result<RgbaImage> {
        let _guard = lock();
        tracing::trace!(library = ?self.library, "Opening document");
        let document = self.pdfium.load_pdf_from_byte_slice(bytes, None).or_raise(|| ErrorKind::Open)?;
        work(&PdfiumDocument { document: &document })
    }
}

struct PdfiumDocument<'a, 'b> {
    document: &'a pdfium_render::prelude::PdfDocument<'b>,
}

impl PdfDocument for PdfiumDocument<'_, '_> {
    fn page_count(&self) -> u16 {
        self.document.pages().len()
    }

    fn page_size(&self, index: u16) -> Result<PageSize> {
        let page = self.document.pages().get(index).or_raise(|| ErrorKind::MissingPage)?;
        Ok(PageSize { width: page.width().value, height: page.height().value })
    }

    fn rasterize(&self, index: u16, width: u32, height: u32) -> Result<RgbaImage> {
        let page = self.document.pages().get(index).or_raise(|| ErrorKind::MissingPage)?;
        let config = PdfRenderConfig::new().set_target_width(width as _).set_target_height(height as _);
        let bitmap = page.render_with_config(&config).or_raise(|| ErrorKind::Rasterize)?;
        let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
        RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(|| exn::Exn::from(ErrorKind::Rasterize))
    }
}
