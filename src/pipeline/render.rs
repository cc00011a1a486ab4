//! PDF rasterisation via pdfium.
//!
//! The whole document is rendered once, up front, into one bitmap per page.
//! pdfium works on the complete byte stream; there is no cheap way to pull a
//! single page out of it mid-loop, so the per-page OCR loop consumes this
//! pre-rendered sequence instead.
//!
//! [`PdfiumEngine`] owns the bound pdfium library and implements both
//! [`Rasterizer`] (here) and [`PdfEditor`](crate::engines::PdfEditor) (in
//! [`super::draw`]), so rendering and drawing share a single binding.

use crate::engines::{RasterImage, Rasterizer};
use crate::error::AnnotateError;
use pdfium_render::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable naming an existing pdfium library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// A bound pdfium library plus the document password, if any.
#[derive(Clone)]
pub struct PdfiumEngine {
    pub(crate) pdfium: Arc<Pdfium>,
    pub(crate) password: Option<String>,
}

// SAFETY: built with pdfium-render's `thread_safe` feature, which serialises
// every call into the library. Documents never leave the thread that opened
// them; only the binding itself is shared.
unsafe impl Send for PdfiumEngine {}
unsafe impl Sync for PdfiumEngine {}

impl fmt::Debug for PdfiumEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfiumEngine")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PdfiumEngine {
    /// Bind to pdfium, from most-specific to least-specific location:
    ///
    /// 1. `library` — an explicit library file, or a directory containing the
    ///    platform library (`libpdfium.so`, `libpdfium.dylib`, `pdfium.dll`);
    /// 2. the `PDFIUM_LIB_PATH` environment variable, same rules;
    /// 3. the system library search path.
    pub fn bind(library: Option<&Path>) -> Result<Self, AnnotateError> {
        let explicit = library
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty());

        let bindings = match explicit {
            Some(path) => {
                let lib = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&path)
                } else {
                    path
                };
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(&lib).map_err(|e| AnnotateError::EngineUnavailable {
                    engine: "pdfium".into(),
                    detail: format!("{}: {:?}", lib.display(), e),
                })?
            }
            None => {
                debug!("Binding pdfium from the system library path");
                Pdfium::bind_to_system_library().map_err(|e| AnnotateError::EngineUnavailable {
                    engine: "pdfium".into(),
                    detail: format!(
                        "{:?}\nSet {} or pass --pdfium-lib to point at libpdfium.",
                        e, PDFIUM_LIB_PATH_ENV
                    ),
                })?
            }
        };

        Ok(Self {
            pdfium: Arc::new(Pdfium::new(bindings)),
            password: None,
        })
    }

    /// User password for encrypted documents.
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }
}

impl Rasterizer for PdfiumEngine {
    fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<Vec<RasterImage>, AnnotateError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, self.password.as_deref())
            .map_err(|e| AnnotateError::Rasterization {
                detail: format!("could not load document: {:?}", e),
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;

        // 72 points per inch: a factor of dpi/72 renders the page at `dpi`.
        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        let mut images = Vec::with_capacity(total_pages);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                AnnotateError::Rasterization {
                    detail: format!("page {}: {:?}", idx + 1, e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(RasterImage::new(idx, dpi, image));
        }

        if images.len() != total_pages {
            return Err(AnnotateError::PageCountMismatch {
                document: total_pages,
                rasterized: images.len(),
            });
        }

        info!("Rasterised {} pages at {} DPI", images.len(), dpi);
        Ok(images)
    }
}
