//! Pixel-space → point-space coordinate mapping.
//!
//! OCR runs on a raster image measured in pixels (top-left origin, y down);
//! boxes are drawn on the vector page measured in points (1/72 inch). The two
//! are related by one scale factor per axis:
//!
//! ```text
//! scale_x = page.width_pt  / image.width_px
//! scale_y = page.height_pt / image.height_px
//! ```
//!
//! The axes are scaled independently because rounding during rasterisation
//! can give the bitmap a slightly different aspect ratio from the page.
//! Factors are computed per page since a single document may mix page sizes.
//!
//! Mapping multiplies before dividing (`px · page / image`), and the far image
//! edge maps straight to the page edge, so the full image extent lands exactly
//! on the full page extent.

use crate::error::AnnotateError;
use serde::{Deserialize, Serialize};

/// Vector size of a page in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A bounding box in raster pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Right edge, `left + width`, computed without overflow.
    pub fn right(&self) -> u64 {
        self.left as u64 + self.width as u64
    }

    /// Bottom edge, `top + height`, computed without overflow.
    pub fn bottom(&self) -> u64 {
        self.top as u64 + self.height as u64
    }
}

/// A rectangle in page points with a top-left origin: `(x0, y0)` is the
/// upper-left corner, `(x1, y1)` the lower-right one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PointRect {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Convert to the PDF user-space convention (bottom-left origin, y up),
    /// returned as `(bottom, left, top, right)`.
    ///
    /// `(origin_left, origin_top)` is the user-space position of the visible
    /// page's top-left corner, i.e. the crop box's left and top edges.
    pub fn to_bottom_left_origin(
        &self,
        origin_left: f64,
        origin_top: f64,
    ) -> (f64, f64, f64, f64) {
        (
            origin_top - self.y1,
            origin_left + self.x0,
            origin_top - self.y0,
            origin_left + self.x1,
        )
    }
}

/// Per-page pixel → point transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
    page: PageGeometry,
    image_width: f64,
    image_height: f64,
}

impl ScaleFactor {
    /// Build the transform for one page.
    ///
    /// `page_num` is 1-indexed and only used for the error message.
    ///
    /// # Errors
    /// [`AnnotateError::Geometry`] when the image has a zero dimension or
    /// the page size is not a positive finite number. Either way the raster
    /// is corrupt and the whole document is rejected.
    pub fn between(
        page_num: usize,
        page: PageGeometry,
        image_width_px: u32,
        image_height_px: u32,
    ) -> Result<Self, AnnotateError> {
        if image_width_px == 0 || image_height_px == 0 {
            return Err(AnnotateError::Geometry {
                page: page_num,
                detail: format!(
                    "raster image is {}x{} px; scale factor is undefined",
                    image_width_px, image_height_px
                ),
            });
        }
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(page.width) || !valid(page.height) {
            return Err(AnnotateError::Geometry {
                page: page_num,
                detail: format!(
                    "page size {}x{} pt is not a positive finite size",
                    page.width, page.height
                ),
            });
        }

        Ok(Self {
            page,
            image_width: image_width_px as f64,
            image_height: image_height_px as f64,
        })
    }

    /// Points per pixel along x.
    pub fn x(&self) -> f64 {
        self.page.width / self.image_width
    }

    /// Points per pixel along y.
    pub fn y(&self) -> f64 {
        self.page.height / self.image_height
    }

    /// Map a pixel box onto the page.
    pub fn map(&self, bbox: &PixelBox) -> PointRect {
        PointRect {
            x0: self.map_x(bbox.left as f64),
            y0: self.map_y(bbox.top as f64),
            x1: self.map_x(bbox.right() as f64),
            y1: self.map_y(bbox.bottom() as f64),
        }
    }

    fn map_x(&self, px: f64) -> f64 {
        if px == self.image_width {
            return self.page.width;
        }
        px * self.page.width / self.image_width
    }

    fn map_y(&self, px: f64) -> f64 {
        if px == self.image_height {
            return self.page.height;
        }
        px * self.page.height / self.image_height
    }
}
