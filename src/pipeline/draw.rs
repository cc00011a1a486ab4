//! Vector annotation via pdfium: open, measure, stroke rectangles, save.
//!
//! Boxes are added as stroked, unfilled path objects. Existing page objects
//! are never touched, so the original content survives unchanged underneath.
//!
//! pdfium's page space has its origin at the bottom-left with y pointing up,
//! while [`PointRect`] uses a top-left origin measured from the visible page.
//! pdfium renders only the crop box, so rectangles are flipped against the
//! crop box's top edge and shifted by its left edge just before they are
//! created.

use super::render::PdfiumEngine;
use crate::config::BoxStyle;
use crate::engines::{PdfEditor, VectorDocument};
use crate::error::AnnotateError;
use crate::geometry::{PageGeometry, PointRect};
use pdfium_render::prelude::*;
use tracing::debug;

impl PdfEditor for PdfiumEngine {
    fn open<'a>(&'a self, pdf: &[u8]) -> Result<Box<dyn VectorDocument + 'a>, AnnotateError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_vec(pdf.to_vec(), self.password.as_deref())
            .map_err(|e| {
                let detail = format!("{:?}", e);
                if detail.contains("Password") || detail.contains("password") {
                    AnnotateError::Open {
                        detail: if self.password.is_some() {
                            "wrong password".to_string()
                        } else {
                            "document is encrypted; provide --password".to_string()
                        },
                    }
                } else {
                    AnnotateError::Open { detail }
                }
            })?;

        debug!("Opened PDF with {} pages", document.pages().len());
        Ok(Box::new(PdfiumDocument { document }))
    }
}

/// An opened pdfium document.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, index: usize) -> Result<PdfPage<'a>, String> {
        let idx = index
            .try_into()
            .map_err(|_| format!("page index {index} out of range"))?;
        self.document
            .pages()
            .get(idx)
            .map_err(|e| format!("{:?}", e))
    }
}

/// User-space `(left, top)` of the visible page's top-left corner.
///
/// The crop box when the page defines one, else the media box, else the
/// plain page size.
fn visible_origin(page: &PdfPage<'_>) -> (f64, f64) {
    let boundaries = page.boundaries();
    let bounds = boundaries
        .crop()
        .or_else(|_| boundaries.media())
        .map(|b| b.bounds)
        .unwrap_or_else(|_| page.page_size());
    (bounds.left().value as f64, bounds.top().value as f64)
}

impl VectorDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_geometry(&self, index: usize) -> Result<PageGeometry, AnnotateError> {
        let page = self.page(index).map_err(|detail| AnnotateError::Geometry {
            page: index + 1,
            detail,
        })?;
        Ok(PageGeometry::new(
            page.width().value as f64,
            page.height().value as f64,
        ))
    }

    fn draw_rect(
        &mut self,
        index: usize,
        rect: &PointRect,
        style: &BoxStyle,
    ) -> Result<(), AnnotateError> {
        self.draw_rects(index, std::slice::from_ref(rect), style)
    }

    /// All of a page's boxes are staged through one handle and the content
    /// stream is regenerated once at the end.
    fn draw_rects(
        &mut self,
        index: usize,
        rects: &[PointRect],
        style: &BoxStyle,
    ) -> Result<(), AnnotateError> {
        let draw_err = |detail: String| AnnotateError::Draw {
            page: index + 1,
            detail,
        };

        let mut page = self.page(index).map_err(draw_err)?;
        page.set_content_regeneration_strategy(PdfPageContentRegenerationStrategy::Manual);
        let (origin_left, origin_top) = visible_origin(&page);
        let stroke = PdfColor::new(style.stroke.r, style.stroke.g, style.stroke.b, 255);
        let width = PdfPoints::new(style.line_width);

        for rect in rects {
            let (bottom, left, top, right) = rect.to_bottom_left_origin(origin_left, origin_top);
            page.objects_mut()
                .create_path_object_rect(
                    PdfRect::new_from_values(bottom as f32, left as f32, top as f32, right as f32),
                    Some(stroke),
                    Some(width),
                    None,
                )
                .map_err(|e| draw_err(format!("{:?}", e)))?;
        }
        page.regenerate_content().map_err(|e| draw_err(format!("{:?}", e)))
    }

    fn finalize(self: Box<Self>) -> Result<Vec<u8>, AnnotateError> {
        self.document
            .save_to_bytes()
            .map_err(|e| AnnotateError::Finalization {
                detail: format!("{:?}", e),
            })
    }
}
