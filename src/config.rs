//! Configuration types for OCR annotation.
//!
//! All pipeline behaviour is controlled through [`AnnotationConfig`], built
//! via its [`AnnotationConfigBuilder`]. Defaults: 300 DPI rasterisation, a
//! confidence threshold of 60 and red 0.8 pt boxes.
//!
//! Engine-specific settings (tesseract binary, language, pdfium location,
//! document password) are not part of this struct; they are given to the
//! engines when they are constructed. See [`TesseractConfig`] and
//! [`crate::pipeline::render::PdfiumEngine`].

use crate::error::AnnotateError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default rasterisation resolution.
pub const DEFAULT_DPI: u32 = 300;
/// Tokens must score strictly above this to be drawn.
pub const DEFAULT_CONFIDENCE_THRESHOLD: i32 = 60;
/// Default stroke width in points.
pub const DEFAULT_LINE_WIDTH: f32 = 0.8;

/// Configuration for one annotation run.
///
/// # Example
/// ```rust
/// use ocr_annotate::{AnnotationConfig, Rgb};
///
/// let config = AnnotationConfig::builder()
///     .dpi(200)
///     .confidence_threshold(75)
///     .stroke(Rgb::new(0, 0, 255))
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct AnnotationConfig {
    /// Rasterisation DPI. Range: 72–600. Default: 300.
    ///
    /// OCR quality drops quickly below 200 DPI on body text. The box
    /// positions do not depend on it: the scale factor is derived from the
    /// actual bitmap size of each page.
    pub dpi: u32,

    /// Minimum confidence, exclusive. Default: 60.
    ///
    /// Tesseract reports `-1` for block/paragraph/line rows; those are always
    /// below the threshold and never drawn.
    pub confidence_threshold: i32,

    /// Stroke colour and width of the drawn boxes.
    pub box_style: BoxStyle,

    /// Number of pages recognised at once. Default: 1 (strictly sequential).
    ///
    /// Only OCR is parallelised. Drawing always happens afterwards on the
    /// thread that owns the document, in page order, so the output is
    /// identical for any value.
    pub concurrency: usize,

    /// Directory for generated output files. Default: the system temp dir.
    pub output_dir: Option<PathBuf>,

    /// Per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            box_style: BoxStyle::default(),
            concurrency: 1,
            output_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnnotationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationConfig")
            .field("dpi", &self.dpi)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("box_style", &self.box_style)
            .field("concurrency", &self.concurrency)
            .field("output_dir", &self.output_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AnnotationProgressCallback>"),
            )
            .finish()
    }
}

impl AnnotationConfig {
    /// Create a new builder for `AnnotationConfig`.
    pub fn builder() -> AnnotationConfigBuilder {
        AnnotationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnnotationConfig`].
#[derive(Debug)]
pub struct AnnotationConfigBuilder {
    config: AnnotationConfig,
}

impl AnnotationConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn confidence_threshold(mut self, threshold: i32) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    pub fn box_style(mut self, style: BoxStyle) -> Self {
        self.config.box_style = style;
        self
    }

    pub fn stroke(mut self, colour: Rgb) -> Self {
        self.config.box_style.stroke = colour;
        self
    }

    pub fn line_width(mut self, width: f32) -> Self {
        self.config.box_style.line_width = width;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnnotationConfig, AnnotateError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(AnnotateError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        let w = c.box_style.line_width;
        if !w.is_finite() || w <= 0.0 {
            return Err(AnnotateError::InvalidConfig(format!(
                "Line width must be a positive number of points, got {w}"
            )));
        }
        if c.concurrency == 0 {
            return Err(AnnotateError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Drawing style ────────────────────────────────────────────────────────

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::RED
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = AnnotateError;

    /// Accepts `red`, `green`, `blue`, `black`, or `#rrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "red" => return Ok(Rgb::new(255, 0, 0)),
            "green" => return Ok(Rgb::new(0, 128, 0)),
            "blue" => return Ok(Rgb::new(0, 0, 255)),
            "black" => return Ok(Rgb::new(0, 0, 0)),
            _ => {}
        }

        let invalid = || AnnotateError::InvalidConfig(format!("Unrecognised colour '{s}'"));
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Stroke style of the drawn boxes. Boxes are never filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxStyle {
    pub stroke: Rgb,
    /// Stroke width in points.
    pub line_width: f32,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            stroke: Rgb::RED,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

// ── Engine settings ──────────────────────────────────────────────────────

/// Settings for the tesseract command-line engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TesseractConfig {
    /// Executable name or path. Default: `tesseract` (looked up on `PATH`).
    pub binary: PathBuf,
    /// Language pack(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub language: String,
    /// Page segmentation mode (`--psm`). Default: engine default.
    pub psm: Option<u8>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            psm: None,
        }
    }
}
