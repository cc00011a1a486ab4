//! Result types returned by the annotation entry points.

use crate::geometry::PageGeometry;
use serde::{Deserialize, Serialize};

/// MIME type of the produced artifact.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A fully annotated document. Only ever constructed after every page was
/// processed and the document was saved successfully.
#[derive(Debug, Clone)]
pub struct AnnotatedPdf {
    /// The serialised PDF.
    pub bytes: Vec<u8>,
    pub report: AnnotationReport,
}

impl AnnotatedPdf {
    pub fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    /// Suggested download name for the response.
    pub fn download_name(&self) -> &'static str {
        "annotated.pdf"
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// What happened on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-indexed page number.
    pub page_num: usize,
    pub width_pt: f64,
    pub height_pt: f64,
    pub image_width_px: u32,
    pub image_height_px: u32,
    /// Points per pixel along x.
    pub scale_x: f64,
    /// Points per pixel along y.
    pub scale_y: f64,
    /// Tokens returned by the OCR engine, before filtering.
    pub tokens_recognized: usize,
    /// Rectangles drawn (tokens that passed the filter).
    pub boxes_drawn: usize,
}

/// Per-document summary of an annotation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationReport {
    pub pages: Vec<PageReport>,
    pub dpi: u32,
    pub confidence_threshold: i32,
    pub total_tokens: usize,
    pub total_boxes: usize,
    /// Wall-clock time for rasterising the whole document.
    pub render_duration_ms: u64,
    /// Wall-clock time spent in OCR (all pages).
    pub ocr_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl AnnotationReport {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Page geometry of a document, without running OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub pages: Vec<PageGeometry>,
}
