//! Error types for the ocr-annotate library.
//!
//! Every stage of the pipeline has its own variant so a failure can be traced
//! back to the step that produced it. Callers facing a client (an HTTP
//! handler, the CLI) only need the coarse split exposed by
//! [`AnnotateError::category`]:
//!
//! * [`ErrorCategory::BadInput`] — the upload is not a PDF. Rejected before
//!   any rasterisation or recognition work starts.
//! * [`ErrorCategory::ProcessingFailed`] — anything that went wrong while
//!   rasterising, recognising, drawing or saving. The underlying message is
//!   kept for diagnostics.
//!
//! No variant carries partial output: a request either produces a complete
//! annotated document or one of these errors.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the ocr-annotate library.
#[derive(Debug, Error)]
pub enum AnnotateError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The upload name does not carry the `.pdf` extension.
    #[error("Only PDF files are supported (got '{filename}')")]
    InvalidInput { filename: String },

    /// The input has no bytes at all.
    #[error("Input is empty; expected a PDF document")]
    EmptyInput,

    /// No `%PDF` signature within the first 1024 bytes.
    #[error("Input is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { magic: Vec<u8> },

    /// Input file could not be read from disk.
    #[error("Failed to read input file '{path}': {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// The PDF library refused to open the document.
    #[error("Failed to open PDF: {detail}")]
    Open { detail: String },

    /// The rasteriser could not produce images for the document or a page.
    #[error("Rasterisation failed: {detail}")]
    Rasterization { detail: String },

    /// The rasteriser returned a different number of images than the
    /// document has pages.
    #[error("Rasteriser produced {rasterized} images for a {document}-page document")]
    PageCountMismatch { document: usize, rasterized: usize },

    /// The OCR engine failed on a page image.
    #[error("Recognition failed for page {page}: {detail}")]
    Recognition { page: usize, detail: String },

    /// Scale factor undefined, typically a zero-sized raster image.
    #[error("Invalid geometry on page {page}: {detail}")]
    Geometry { page: usize, detail: String },

    /// A rectangle could not be added to a page.
    #[error("Failed to draw on page {page}: {detail}")]
    Draw { page: usize, detail: String },

    /// The annotated document could not be serialised.
    #[error("Failed to save annotated PDF: {detail}")]
    Finalization { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// pdfium or tesseract could not be located or loaded.
    #[error("{engine} is not available: {detail}")]
    EngineUnavailable { engine: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (worker panic, runtime creation).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Client-facing classification of an [`AnnotateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The request itself was wrong: not a PDF.
    BadInput,
    /// The request was fine but processing it failed.
    ProcessingFailed,
}

impl AnnotateError {
    /// Coarse category used when reporting the error to a client.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } | Self::EmptyInput | Self::NotAPdf { .. } => {
                ErrorCategory::BadInput
            }
            _ => ErrorCategory::ProcessingFailed,
        }
    }

    /// HTTP status code matching [`Self::category`].
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::BadInput => 400,
            ErrorCategory::ProcessingFailed => 500,
        }
    }

    /// JSON-serialisable body carrying the human-readable message.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

/// Structured error payload, serialised as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&AnnotateError> for ErrorBody {
    fn from(e: &AnnotateError) -> Self {
        e.to_body()
    }
}
