//! Collaborator seams: rasteriser, OCR engine and PDF editor.
//!
//! The pipeline only ever talks to these traits. Production implementations
//! live in [`crate::pipeline`] (pdfium for rendering and drawing, tesseract
//! for recognition); tests substitute in-memory mocks so the orchestration
//! logic can be checked without native libraries.

use crate::config::BoxStyle;
use crate::error::AnnotateError;
use crate::geometry::{PageGeometry, PixelBox, PointRect};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One rasterised page.
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// 0-indexed position in the document.
    pub page_index: usize,
    /// Resolution the page was rendered at.
    pub dpi: u32,
    pub image: DynamicImage,
}

impl RasterImage {
    pub fn new(page_index: usize, dpi: u32, image: DynamicImage) -> Self {
        Self {
            page_index,
            dpi,
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// One unit of text reported by the OCR engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedToken {
    /// Raw text; may be empty or whitespace for structural entries.
    pub text: String,
    /// Engine-defined score. Tesseract uses 0–100 and `-1` for non-word rows.
    pub confidence: i32,
    pub bbox: PixelBox,
}

impl RecognizedToken {
    pub fn new(text: impl Into<String>, confidence: i32, bbox: PixelBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox,
        }
    }

    /// Whether this token earns a rectangle: non-blank text and a
    /// confidence strictly above `threshold`.
    pub fn is_drawable(&self, threshold: i32) -> bool {
        !self.text.trim().is_empty() && self.confidence > threshold
    }
}

/// Converts a whole PDF into one image per page, in page order.
pub trait Rasterizer: Send + Sync {
    /// Rasterise every page at `dpi`.
    ///
    /// Implementations must return an error rather than silently skip a page.
    fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<Vec<RasterImage>, AnnotateError>;
}

/// Runs OCR on a single page image.
pub trait Recognizer: Send + Sync {
    /// Recognise the tokens on `image`, in whatever order the engine emits them.
    fn recognize(&self, image: &RasterImage) -> Result<Vec<RecognizedToken>, AnnotateError>;
}

/// Opens PDFs for in-place annotation.
pub trait PdfEditor: Send + Sync {
    /// Open `pdf` for editing. The returned handle borrows the editor.
    fn open<'a>(&'a self, pdf: &[u8]) -> Result<Box<dyn VectorDocument + 'a>, AnnotateError>;
}

/// A mutable, opened PDF document.
///
/// Not shared across threads: the pipeline owns it on a single thread from
/// `open` until `finalize`.
pub trait VectorDocument {
    fn page_count(&self) -> usize;

    /// Size of page `index` (0-indexed) in points.
    fn page_geometry(&self, index: usize) -> Result<PageGeometry, AnnotateError>;

    /// Stroke `rect` (top-left origin, points) onto page `index`.
    fn draw_rect(
        &mut self,
        index: usize,
        rect: &PointRect,
        style: &BoxStyle,
    ) -> Result<(), AnnotateError>;

    /// Stroke several rectangles onto one page. Backends that pay a cost per
    /// page access override this to batch the work.
    fn draw_rects(
        &mut self,
        index: usize,
        rects: &[PointRect],
        style: &BoxStyle,
    ) -> Result<(), AnnotateError> {
        for rect in rects {
            self.draw_rect(index, rect, style)?;
        }
        Ok(())
    }

    /// Serialise the document, consuming the handle.
    fn finalize(self: Box<Self>) -> Result<Vec<u8>, AnnotateError>;
}

/// The three collaborators bundled for one pipeline run.
///
/// Cheap to clone; every engine sits behind an `Arc` so the bundle can be
/// moved into a blocking task.
#[derive(Clone)]
pub struct Engines {
    pub rasterizer: Arc<dyn Rasterizer>,
    pub recognizer: Arc<dyn Recognizer>,
    pub editor: Arc<dyn PdfEditor>,
}

impl Engines {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        recognizer: Arc<dyn Recognizer>,
        editor: Arc<dyn PdfEditor>,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            editor,
        }
    }
}

impl fmt::Debug for Engines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engines")
            .field("rasterizer", &"<dyn Rasterizer>")
            .field("recognizer", &"<dyn Recognizer>")
            .field("editor", &"<dyn PdfEditor>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, confidence: i32) -> RecognizedToken {
        RecognizedToken::new(text, confidence, PixelBox::new(0, 0, 1, 1))
    }

    #[test]
    fn drawable_requires_text_and_confidence_above_threshold() {
        assert!(token("Hello", 85).is_drawable(60));
        assert!(token("  padded\t", 61).is_drawable(60));
        assert!(!token("Hello", 60).is_drawable(60));
        assert!(!token("Hello", 40).is_drawable(60));
        assert!(!token("Hello", -1).is_drawable(60));
        assert!(!token(" ", 99).is_drawable(60));
        assert!(!token("", 99).is_drawable(60));
        assert!(!token("\n\t", 99).is_drawable(60));
    }

    #[test]
    fn raster_image_reports_pixel_size() {
        let img = RasterImage::new(0, 300, DynamicImage::new_luma8(17, 9));
        assert_eq!((img.width(), img.height()), (17, 9));
    }
}
