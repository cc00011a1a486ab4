//! # ocr-annotate
//!
//! Draw OCR word boxes onto the original vector PDF.
//!
//! Each page is rasterised, the image is run through an OCR engine, and every
//! confidently recognised word gets a thin stroked rectangle drawn on the
//! *vector* page at the matching position. The original text, fonts and
//! images are left untouched; the boxes are plain path objects on top, so the
//! output stays sharp at any zoom and remains selectable where the input was.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Input     .pdf name + %PDF signature, else 400-class error
//!  ├─ 2. Open      vector document via pdfium
//!  ├─ 3. Render    every page at the configured DPI (default 300)
//!  ├─ 4. Recognise tesseract TSV → tokens (text, confidence, pixel box)
//!  ├─ 5. Map       pixel box × (page points / image pixels) → point rect
//!  ├─ 6. Draw      one red 0.8pt box per token with text and conf > 60
//!  └─ 7. Save      annotated PDF bytes + per-page report
//! ```
//!
//! The scale factor is derived from the actual bitmap size of each page, not
//! from the DPI, so boxes line up even when the rasteriser rounds.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr_annotate::{annotate_file, AnnotationConfig, Engines, PdfiumEngine, TesseractRecognizer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pdfium = Arc::new(PdfiumEngine::bind(None)?);
//!     let tesseract = TesseractRecognizer::default();
//!     tesseract.ensure_available()?;
//!     let engines = Engines::new(pdfium.clone(), Arc::new(tesseract), pdfium);
//!
//!     let annotated = annotate_file("scan.pdf", &engines, &AnnotationConfig::default()).await?;
//!     std::fs::write("scan.annotated.pdf", &annotated.bytes)?;
//!     eprintln!("{} boxes on {} pages",
//!         annotated.report.total_boxes,
//!         annotated.report.page_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr-annotate` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ocr-annotate = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime Requirements
//!
//! * **pdfium** shared library: found via an explicit path, the
//!   `PDFIUM_LIB_PATH` environment variable, or the system library path.
//! * **tesseract** executable on `PATH` (or configured in [`TesseractConfig`]),
//!   with the language data for the configured language.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod annotate;
pub mod config;
pub mod engines;
pub mod error;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use annotate::{
    annotate_blocking, annotate_bytes, annotate_file, annotate_to_file, annotate_to_store,
    annotate_upload, inspect, RequestState,
};
pub use config::{AnnotationConfig, AnnotationConfigBuilder, BoxStyle, Rgb, TesseractConfig};
pub use engines::{
    Engines, PdfEditor, RasterImage, Rasterizer, RecognizedToken, Recognizer, VectorDocument,
};
pub use error::{AnnotateError, ErrorBody, ErrorCategory};
pub use geometry::{PageGeometry, PixelBox, PointRect, ScaleFactor};
pub use output::{AnnotatedPdf, AnnotationReport, DocumentInfo, PageReport, PDF_CONTENT_TYPE};
pub use pipeline::ocr::TesseractRecognizer;
pub use pipeline::render::PdfiumEngine;
pub use progress::{AnnotationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use storage::{OutputStore, StoredOutput};
